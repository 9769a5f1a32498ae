//! Editor command handler.

use anyhow::{Context, Result, anyhow};
use comfy_table::{ContentArrangement, Table};
use foundee_core::editor::{ClaimEditor, DetailsEditor, DetailsForm, Opened};
use foundee_core::routes::Route;
use foundee_types::DetailField;

use super::{App, print_notice};
use crate::cli::EditArgs;

/// A parsed `--set`, `--show` or `--hide`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Edit {
    Value(DetailField, String),
    Visible(DetailField, bool),
}

fn parse_edits(args: &EditArgs) -> Result<Vec<Edit>> {
    let mut edits = Vec::new();
    for pair in &args.set {
        let (field, value) = pair
            .split_once('=')
            .with_context(|| format!("expected FIELD=VALUE, got '{pair}'"))?;
        let field: DetailField = field.parse().map_err(|e: String| anyhow!(e))?;
        edits.push(Edit::Value(field, value.to_string()));
    }
    for (names, visible) in [(&args.show, true), (&args.hide, false)] {
        for name in names {
            let field: DetailField = name.parse().map_err(|e: String| anyhow!(e))?;
            edits.push(Edit::Visible(field, visible));
        }
    }
    Ok(edits)
}

fn apply(form: &mut DetailsForm, edits: &[Edit]) {
    for edit in edits {
        match edit {
            Edit::Value(field, value) => form.set_value(*field, value.clone()),
            Edit::Visible(field, visible) => form.set_visible(*field, *visible),
        }
    }
}

pub async fn run(app: &App, args: &EditArgs) -> Result<Option<Route>> {
    // Validate before any backend call so a typo never triggers a claim.
    let edits = parse_edits(args)?;

    let opened = ClaimEditor::new(app.client.clone(), &args.id, args.bind)
        .open()
        .await?;
    let mut editor = match opened {
        Opened::Ready(editor) => editor,
        Opened::Redirect(route) => return Ok(Some(route)),
    };
    if let Some(notice) = editor.take_notice() {
        print_notice(&notice);
    }

    apply(editor.form_mut(), &edits);
    if editor.form().is_dirty() {
        match editor.save().await {
            Ok(notice) => print_notice(&notice),
            Err(err) => {
                if let Some(route) = err.redirect.clone() {
                    eprintln!("{err}");
                    return Ok(Some(route));
                }
                print_form(&editor);
                return Err(err.into());
            }
        }
    }

    print_form(&editor);
    Ok(None)
}

fn print_form(editor: &DetailsEditor) {
    let form = editor.form();
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(["Field", "Value", "Visibility"]);
    for field in DetailField::ALL {
        let visibility = if form.is_visible(field) {
            "Visible"
        } else {
            "Hidden"
        };
        table.add_row(vec![
            field.label().to_string(),
            form.value(field).to_string(),
            visibility.to_string(),
        ]);
    }
    println!("QR code {}", editor.code_id());
    println!("{table}");

    let preview = form.preview();
    if preview.is_empty() {
        println!("Finders will see no contact information.");
    } else {
        println!("Finders will see:");
        for entry in preview {
            println!("  {}: {}", entry.field.label(), entry.value);
        }
    }
    if form.is_dirty() {
        println!("(unsaved changes)");
    }
}
