use std::sync::Arc;

use axum::{extract::State, response::Html};

use crate::{server::AppState, types::SiteProfile};

const INDEX_HTML: &str = include_str!("../../assets/index.html");
const DEFAULT_OWNER_NAME: &str = "PORTFOLIO";

pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_index(&state.site))
}

/// Fills the owner's details into the page template.
///
/// The template holds `{{owner_name}}`, `{{portrait}}`, `{{social_links}}`
/// and `{{snapcode}}`. Sections without a configured value render as nothing.
/// Substitution is a single pass, so configured values are never themselves
/// scanned for placeholders.
pub fn render_index(site: &SiteProfile) -> String {
    let name = site
        .owner_name
        .as_deref()
        .unwrap_or(DEFAULT_OWNER_NAME)
        .to_uppercase();

    let mut out = String::with_capacity(INDEX_HTML.len());
    let mut rest = INDEX_HTML;
    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start..].find("}}") else {
            break;
        };
        out.push_str(&rest[..start]);

        let key = &rest[start + 2..start + len];
        match key {
            "owner_name" => out.push_str(&escape_html(&name)),
            "portrait" => out.push_str(&portrait(site, &name)),
            "social_links" => out.push_str(&social_links(site)),
            "snapcode" => out.push_str(&snapcode(site)),
            _ => out.push_str(&rest[start..start + len + 2]),
        }
        rest = &rest[start + len + 2..];
    }
    out.push_str(rest);
    out
}

fn portrait(site: &SiteProfile, name: &str) -> String {
    match &site.photo_url {
        Some(url) => format!(
            r#"<img class="portrait" src="{}" alt="{}" width="200" height="200">"#,
            escape_html(url),
            escape_html(name)
        ),
        None => String::new(),
    }
}

fn social_links(site: &SiteProfile) -> String {
    if site.social_links.is_empty() {
        return String::new();
    }

    let links: String = site
        .social_links
        .iter()
        .map(|link| {
            format!(
                r#"<a href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
                escape_html(&link.url),
                escape_html(&link.platform.to_uppercase())
            )
        })
        .collect();
    format!(r#"<nav class="social">{links}</nav>"#)
}

fn snapcode(site: &SiteProfile) -> String {
    match &site.snapcode_url {
        Some(url) => format!(
            r#"<div class="snapcode"><img src="{}" alt="Snapcode" width="160" height="160"></div>"#,
            escape_html(url)
        ),
        None => String::new(),
    }
}

fn escape_html(raw: &str) -> String {
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
