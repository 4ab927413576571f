//! HTML rendering of the quote sheet and its editor.
//!
//! The viewer is a print-ready table: one spanning label cell per group,
//! highlighted cells for flagged items, a total row and two blank spacer rows
//! for handwritten additions. The editor is a plain HTML form whose field
//! names come from [`crate::form`].

use crate::config::RenderConfig;
use crate::form::{group_field, item_field, EditorAction, QuoteForm, ACTION_FIELD};
use crate::quote::{Group, Quote};

/// Number of table columns.
const COLUMNS: usize = 5;

/// Blank rows appended after the total.
const SPACER_ROWS: usize = 2;

/// CSS class applied to highlighted item cells.
const HIGHLIGHT_CLASS: &str = "highlight";

/// Format a number en-US style with no fraction digits (`1,234,568`).
#[must_use]
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Escape text for use in HTML content and double-quoted attributes.
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Escape text and turn newlines into `<br>`.
fn escape_multiline(raw: &str) -> String {
    escape_html(raw).replace("\r\n", "\n").replace('\n', "<br>")
}

fn cell(content: &str, class: Option<&str>) -> String {
    match class {
        Some(class) if !class.is_empty() => {
            format!("<td class=\"{class}\">{}</td>", escape_html(content))
        }
        _ => format!("<td>{}</td>", escape_html(content)),
    }
}

/// Table rows for one group; empty when the group has no items.
fn group_rows(group: &Group) -> String {
    let mut rows = String::new();
    let span = group.items.len();

    for (index, item) in group.items.iter().enumerate() {
        rows.push_str("<tr>");
        if index == 0 {
            rows.push_str(&format!(
                "<td class=\"group-cell\" rowspan=\"{span}\">{}</td>",
                escape_html(&group.label)
            ));
        }
        let class = item.highlight.then_some(HIGHLIGHT_CLASS);
        rows.push_str(&cell(&item.kind, class));
        rows.push_str(&cell(&item.origin, class));
        rows.push_str(&cell(&format_number(item.price), class));
        rows.push_str(&cell(&item.notes, None));
        rows.push_str("</tr>\n");
    }
    rows
}

fn total_row(total: f64, label: &str) -> String {
    format!(
        "<tr class=\"total-row\"><td class=\"total-label\" colspan=\"3\">{}</td>\
         <td class=\"total-value\">{}</td><td></td></tr>\n",
        escape_html(label),
        format_number(total)
    )
}

fn spacer_rows() -> String {
    format!("<tr class=\"spacer-row\"><td colspan=\"{COLUMNS}\"></td></tr>\n").repeat(SPACER_ROWS)
}

/// The `<tbody>` contents for a quote.
#[must_use]
pub fn table_body(quote: &Quote, options: &RenderConfig) -> String {
    let mut body: String = quote.groups.iter().map(group_rows).collect();
    body.push_str(&total_row(quote.computed_total(), &options.total_label));
    body.push_str(&spacer_rows());
    body
}

fn page(options: &RenderConfig, title: &str, main: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"{lang}\" dir=\"{dir}\">\n<head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n\
         <link rel=\"stylesheet\" href=\"/styles.css\">\n\
         </head>\n<body>\n{main}</body>\n</html>\n",
        lang = escape_html(&options.lang),
        dir = escape_html(&options.dir),
        title = escape_html(title),
    )
}

fn table(options: &RenderConfig, body: &str) -> String {
    let headings: String = options
        .headings
        .iter()
        .map(|h| format!("<th>{}</th>", escape_html(h)))
        .collect();
    format!(
        "<table class=\"quote-table\">\n<thead><tr>{headings}</tr></thead>\n\
         <tbody id=\"quote-body\">\n{body}</tbody>\n</table>\n"
    )
}

/// Render the quote sheet as a standalone HTML document.
#[must_use]
pub fn render_quote(quote: &Quote, options: &RenderConfig) -> String {
    let title = if quote.title.is_empty() {
        options.page_title.as_str()
    } else {
        quote.title.as_str()
    };
    let main = format!(
        "<main class=\"quote-sheet\">\n<header class=\"quote-header\">\n\
         <h1 class=\"quote-title\">{}</h1>\n<p class=\"quote-client\">{}</p>\n</header>\n\
         <section class=\"quote-intro\"><p>{}</p></section>\n{}</main>\n",
        escape_html(title),
        escape_html(&quote.client),
        escape_multiline(&quote.intro),
        table(options, &table_body(quote, options)),
    );
    page(options, title, &main)
}

/// Render the quote sheet shell with an error row in place of the data.
#[must_use]
pub fn render_load_error(message: &str, options: &RenderConfig) -> String {
    let row = format!(
        "<tr class=\"error-row\"><td colspan=\"{COLUMNS}\" style=\"color: red; text-align: center\">{}</td></tr>\n",
        escape_html(message)
    );
    let main = format!(
        "<main class=\"quote-sheet\">\n<header class=\"quote-header\">\n\
         <h1 class=\"quote-title\">{}</h1>\n</header>\n{}</main>\n",
        escape_html(&options.page_title),
        table(options, &row),
    );
    page(options, &options.page_title, &main)
}

fn text_input(name: &str, value: &str, class: &str) -> String {
    format!(
        "<input type=\"text\" class=\"{class}\" name=\"{}\" value=\"{}\">",
        escape_html(name),
        escape_html(value)
    )
}

fn action_button(action: EditorAction, label: &str, class: &str) -> String {
    format!(
        "<button type=\"submit\" class=\"{class}\" name=\"{ACTION_FIELD}\" value=\"{}\">{}</button>",
        escape_html(&action.value()),
        escape_html(label)
    )
}

/// Render the editor page for the given form state.
///
/// `notice` is shown above the form, e.g. after a failed save.
#[must_use]
pub fn render_editor(form: &QuoteForm, options: &RenderConfig, notice: Option<&str>) -> String {
    let mut main = String::from("<main class=\"editor\">\n");
    if let Some(notice) = notice {
        main.push_str(&format!(
            "<p class=\"notice\" role=\"status\">{}</p>\n",
            escape_html(notice)
        ));
    }
    main.push_str("<form method=\"post\" action=\"/editor\" class=\"quote-form\">\n");
    // Implicit submission (Enter in a text input) uses the first submit button.
    main.push_str(&format!(
        "<button type=\"submit\" name=\"{ACTION_FIELD}\" value=\"{}\" tabindex=\"-1\" \
         aria-hidden=\"true\" style=\"position: absolute; left: -9999px\"></button>\n",
        EditorAction::Save.value()
    ));
    main.push_str(&format!(
        "<label>Title {}</label>\n<label>Client {}</label>\n\
         <label>Intro <textarea name=\"intro\" class=\"input-intro\">{}</textarea></label>\n",
        text_input("title", &form.title, "input-title"),
        text_input("client", &form.client, "input-client"),
        escape_html(&form.intro),
    ));

    main.push_str("<div id=\"groups-container\">\n");
    for (g, group) in form.groups.iter().enumerate() {
        main.push_str("<fieldset class=\"group-card\">\n");
        main.push_str(&text_input(&group_field(g, "label"), &group.label, "group-label"));
        main.push_str(&action_button(
            EditorAction::RemoveGroup(g),
            "Remove group",
            "remove-group",
        ));
        main.push_str("\n<div class=\"items-container\">\n");
        for (i, item) in group.items.iter().enumerate() {
            main.push_str("<div class=\"item-row\">");
            main.push_str(&text_input(&item_field(g, i, "type"), &item.kind, "item-type"));
            main.push_str(&text_input(
                &item_field(g, i, "origin"),
                &item.origin,
                "item-origin",
            ));
            main.push_str(&format!(
                "<input type=\"number\" step=\"any\" class=\"item-price\" name=\"{}\" value=\"{}\">",
                escape_html(&item_field(g, i, "price")),
                escape_html(&item.price)
            ));
            main.push_str(&text_input(&item_field(g, i, "notes"), &item.notes, "item-notes"));
            main.push_str(&format!(
                "<input type=\"checkbox\" class=\"item-highlight\" name=\"{}\"{}>",
                escape_html(&item_field(g, i, "highlight")),
                if item.highlight { " checked" } else { "" }
            ));
            main.push_str(&action_button(
                EditorAction::RemoveItem(g, i),
                "Remove",
                "remove-item",
            ));
            main.push_str("</div>\n");
        }
        main.push_str("</div>\n");
        main.push_str(&action_button(EditorAction::AddItem(g), "Add item", "add-item"));
        main.push_str("\n</fieldset>\n");
    }
    main.push_str("</div>\n");

    main.push_str(&action_button(EditorAction::AddGroup, "Add group", "add-group"));
    main.push('\n');
    main.push_str(&action_button(EditorAction::Save, "Save", "save"));
    main.push('\n');
    main.push_str(&action_button(EditorAction::Reset, "Reset", "reset"));
    main.push_str("\n</form>\n</main>\n");

    page(options, &options.page_title, &main)
}
