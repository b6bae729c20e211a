//! HTML rendering for the form, result and error pages.

use core::fmt::Write as _;

use axum::http::StatusCode;
use churn_structs::{SchemaArtifact, ID_COLUMN};
use serde_json::Value;

const STYLE: &str = "body{font-family:sans-serif;max-width:40rem;margin:2rem auto}\
label{display:block;margin-top:.6rem}input,select{width:100%}\
pre{background:#f4f4f4;padding:1rem}";

/// Escapes text for use in element content and quoted attributes.
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title>\
         <style>{STYLE}</style></head><body>\n{body}</body></html>\n",
        title = escape_html(title),
    )
}

/// Prediction form with one input per schema feature.
#[must_use]
pub fn form_page(schema: &SchemaArtifact) -> String {
    let mut body = String::from("<h1>Churn Prediction</h1>\n<form method=\"post\" action=\"/predict\">\n");

    let _ = writeln!(
        body,
        "<label>{id}<input type=\"text\" name=\"{id}\" value=\"web-user\"></label>",
        id = ID_COLUMN
    );

    for name in &schema.numeric_features {
        let name = escape_html(name);
        let _ = writeln!(
            body,
            "<label>{name}<input type=\"number\" step=\"any\" name=\"{name}\" required></label>"
        );
    }

    for (name, categories) in &schema.categorical_features {
        let name = escape_html(name);
        let _ = writeln!(body, "<label>{name}<select name=\"{name}\">");
        for category in categories {
            let category = escape_html(category);
            let _ = writeln!(body, "<option value=\"{category}\">{category}</option>");
        }
        body.push_str("</select></label>\n");
    }

    body.push_str("<p><button type=\"submit\">Predict</button></p>\n</form>\n");
    page("Churn Prediction", &body)
}

/// Result page showing the service response as pretty JSON.
#[must_use]
pub fn result_page(result: &Value) -> String {
    let pretty = serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string());
    let body = format!(
        "<h1>Prediction</h1>\n<pre>{}</pre>\n<p><a href=\"/\">Back</a></p>\n",
        escape_html(&pretty)
    );
    page("Prediction", &body)
}

#[must_use]
pub fn error_page(status: StatusCode, message: &str) -> String {
    let body = format!(
        "<h1>{status}</h1>\n<p>{}</p>\n<p><a href=\"/\">Back</a></p>\n",
        escape_html(message)
    );
    page("Error", &body)
}
