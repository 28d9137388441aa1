//! Markdown hover texts.

use hleb_lsp_index::config::{ConfigFiles, ParamEntry};
use hleb_lsp_index::framework::RequestSource;
use hleb_lsp_types::{RouteInfo, UNDEFINED_VALUE};

const DOCS_URL: &str = "https://hleb2framework.ru";

const CONFIGURATION_PAGE: &str = "/2/0/configuration";
const REQUEST_PAGE: &str = "/2/0/container/request";
const ROUTING_PAGE: &str = "/2/0/routing";

/// Closing line of every hover, linking to the documentation page.
pub fn footer(lang: &str, page: &str) -> String {
    format!(
        "---\nHLEB2 Framework [Documentation]({}/{}/{})",
        DOCS_URL,
        lang.trim_matches('/'),
        page.trim_start_matches('/')
    )
}

fn with_footer(body: String, lang: &str, page: &str) -> String {
    format!("{}\n\n{}", body, footer(lang, page))
}

/// First file of the group that takes precedence.
fn first_active(files: &ConfigFiles) -> Option<&str> {
    if files.module_active {
        files.module.first().map(String::as_str)
    } else {
        files.project.first().map(String::as_str)
    }
}

fn searched_line(key: Option<&str>) -> String {
    match key {
        Some(key) => format!("The `{}` parameter will be searched in the following files:", key),
        None => "The parameter will be searched in the following files:".to_string(),
    }
}

/// Hover for a config name argument with at least one candidate file.
pub fn config_name_hover(name: &str, key: Option<&str>, files: &ConfigFiles, lang: &str) -> String {
    let selected = first_active(files);
    let mut body = format!("### Configuration file type (`{}`)\n\n{}\n", name, searched_line(key));
    for (file, module) in files.ordered() {
        let mut line = format!("/{}", file);
        if Some(file) == selected {
            line = format!("**{}**", line);
        }
        if module {
            line.push_str(" (current module)");
        }
        body.push_str(&format!("\n- {}", line));
    }
    with_footer(body, lang, CONFIGURATION_PAGE)
}

/// Hover for a config name that matches no file.
pub fn config_not_found(lang: &str) -> String {
    let body = "### Configuration file not found\n\n\
        Basic values:\n\n\
        - `common`: frequently needed project settings\n\
        - `database`: database settings overridden in modules\n\
        - `main`: main settings overridden in modules\n\
        - `system`: system options for advanced customization"
        .to_string();
    with_footer(body, lang, CONFIGURATION_PAGE)
}

/// Hover for a config key argument.
///
/// Entries with an `undefined` value are left out; with nothing left the
/// generic notice is shown.
pub fn config_key_hover(key: &str, files: &ConfigFiles, entries: &[ParamEntry], lang: &str) -> String {
    let defined: Vec<&ParamEntry> = entries.iter().filter(|e| e.value != UNDEFINED_VALUE).collect();
    if defined.is_empty() {
        return config_param_undefined(lang);
    }

    // The effective value comes from the first file of the active group
    // that declares the key.
    let selected = defined
        .iter()
        .find(|e| e.module == files.module_active)
        .map(|e| e.file.as_str());
    let mut body = format!("### Configuration parameter\n\n{}\n", searched_line(Some(key)));
    for entry in &defined {
        let value = if Some(entry.file.as_str()) == selected {
            format!("**`{}`**", entry.value)
        } else {
            format!("`{}`", entry.value)
        };
        let mut line = format!("\n- /{} [{}]", entry.file, value);
        if entry.module {
            line.push_str(" (current module)");
        }
        body.push_str(&line);
    }
    with_footer(body, lang, CONFIGURATION_PAGE)
}

pub fn config_param_undefined(lang: &str) -> String {
    with_footer("### Configuration parameter".to_string(), lang, CONFIGURATION_PAGE)
}

pub fn request_hover(source: RequestSource, lang: &str) -> String {
    let body = match source {
        RequestSource::Route => "### Dynamic route option\n\n\
            Returns an OBJECT with the ability to get the parameter's value in various types."
            .to_string(),
        RequestSource::Get | RequestSource::Post => format!(
            "### Parameter from request body\n\n\
            Returns the HTTP {} parameter as an OBJECT by name from the request body.",
            if source == RequestSource::Get { "GET" } else { "POST" }
        ),
    };
    with_footer(body, lang, REQUEST_PAGE)
}

fn route_summary(route: &RouteInfo) -> String {
    let mut summary = format!("`{}` `{}`", route.methods.join("|"), route.full_address);
    if let Some(name) = &route.name {
        summary.push_str(&format!("\n\nName: `{}`", name));
    }
    if let Some(controller) = &route.controller {
        summary.push_str(&format!("\n\nController: `{}`", controller));
    }
    summary
}

/// Hover for a route address, with the indexed route when known.
pub fn route_address_hover(route: Option<&RouteInfo>, lang: &str) -> String {
    let mut body = "### Route address".to_string();
    if let Some(route) = route {
        body.push_str("\n\n");
        body.push_str(&route_summary(route));
    }
    with_footer(body, lang, ROUTING_PAGE)
}

pub fn route_prefix_hover(lang: &str) -> String {
    with_footer("### Address prefix for route".to_string(), lang, ROUTING_PAGE)
}

pub fn route_name_hover(route: &RouteInfo, lang: &str) -> String {
    let body = format!("### Route name\n\n{}", route_summary(route));
    with_footer(body, lang, ROUTING_PAGE)
}
