//! Route declarations in `routes/**/*.php`.
//!
//! ```php
//! Route::toGroup()->prefix('/api');
//!     Route::get('/users', ...)->name('users')->controller(UserController::class, 'index');
//! Route::endGroup();
//! ```

use hleb_lsp_parser::calls::{statement_calls, CallSite};
use hleb_lsp_parser::parser::FileParser;
use hleb_lsp_parser::symbols::extract_file_symbols;
use hleb_lsp_types::RouteInfo;

/// Route class as written in route files.
pub const ROUTE_CLASS: &str = "Route";

/// Methods declaring a route with the address as the first argument.
pub const ROUTE_VERBS: &[&str] = &["get", "post", "put", "delete", "patch", "options", "any"];

pub fn is_route_file(rel: &str) -> bool {
    rel.starts_with("routes/") && rel.ends_with(".php")
}

/// Whether `call` is `Route::<method>(...)` on the global `Route` class.
pub fn is_route_call(call: &CallSite, methods: &[&str]) -> bool {
    call.static_call().is_some_and(|(class, method)| {
        class.is(ROUTE_CLASS) && methods.iter().any(|m| m.eq_ignore_ascii_case(method))
    })
}

/// Argument index holding the address for a route-declaring method.
pub fn address_index(method: &str) -> Option<usize> {
    if method.eq_ignore_ascii_case("match") {
        Some(1)
    } else if ROUTE_VERBS.iter().any(|v| v.eq_ignore_ascii_case(method)) {
        Some(0)
    } else {
        None
    }
}

/// Parse a route file and list its routes in declaration order.
pub fn extract_routes(source: &str, rel: &str) -> Vec<RouteInfo> {
    let parser = FileParser::from_source(source);
    let Some(tree) = parser.tree() else {
        return Vec::new();
    };
    let symbols = extract_file_symbols(tree, source);

    let mut groups: Vec<Option<String>> = Vec::new();
    let mut routes = Vec::new();
    for statement in statement_calls(tree, source, &symbols) {
        let root = statement.chain_root();
        if is_route_call(root, &["toGroup"]) {
            groups.push(chain_argument(&statement, "prefix"));
            continue;
        }
        if is_route_call(root, &["endGroup"]) {
            groups.pop();
            continue;
        }
        if let Some(route) = route_from_chain(&statement, &groups, rel) {
            routes.push(route);
        }
    }
    tracing::debug!("{}: {} routes", rel, routes.len());
    routes
}

fn route_from_chain(statement: &CallSite, groups: &[Option<String>], rel: &str) -> Option<RouteInfo> {
    let root = statement.chain_root();
    let (class, method) = root.static_call()?;
    if !class.is(ROUTE_CLASS) {
        return None;
    }
    let index = address_index(method)?;
    let literal = root.argument(index)?.string.as_ref()?;

    let methods = if method.eq_ignore_ascii_case("match") {
        root.argument(0).map(|a| match_methods(&a.text)).unwrap_or_default()
    } else {
        vec![method.to_ascii_uppercase()]
    };

    let prefixes: Vec<&str> = groups.iter().flatten().map(String::as_str).collect();
    Some(RouteInfo {
        methods,
        address: literal.value.clone(),
        full_address: join_address(&prefixes, &literal.value),
        name: chain_argument(statement, "name"),
        controller: controller(statement),
        file: rel.to_string(),
        range: literal.content_range,
    })
}

/// First string argument of the chain call named `method`.
fn chain_argument(statement: &CallSite, method: &str) -> Option<String> {
    statement
        .chain()
        .into_iter()
        .find(|c| c.method_name().is_some_and(|m| m.eq_ignore_ascii_case(method)))
        .and_then(|c| c.argument(0))
        .and_then(|a| a.string.as_ref())
        .map(|s| s.value.clone())
}

/// `Class::method` from `->controller(Class::class, 'method')`.
fn controller(statement: &CallSite) -> Option<String> {
    let call = statement
        .chain()
        .into_iter()
        .find(|c| c.method_name().is_some_and(|m| m.eq_ignore_ascii_case("controller")))?;
    let first = call.argument(0)?;
    let class = match (&first.class_constant, &first.string) {
        (Some(class), _) => class.fqn.clone(),
        (None, Some(s)) => s.value.trim_start_matches('\\').to_string(),
        (None, None) => return None,
    };
    match call.argument(1).and_then(|a| a.string.as_ref()) {
        Some(method) => Some(format!("{}::{}", class, method.value)),
        None => Some(class),
    }
}

/// Verbs of `Route::match(['get', 'post'], ...)`.
fn match_methods(text: &str) -> Vec<String> {
    let mut methods = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(['\'', '"']) {
        let quote = rest[start..].chars().next().unwrap_or('\'');
        let after = &rest[start + 1..];
        let Some(end) = after.find(quote) else {
            break;
        };
        let verb = after[..end].trim();
        if !verb.is_empty() {
            methods.push(verb.to_ascii_uppercase());
        }
        rest = &after[end + 1..];
    }
    methods
}

/// Join group prefixes and an address into `/a/b/c`.
pub fn join_address(prefixes: &[&str], address: &str) -> String {
    let segments: Vec<&str> = prefixes
        .iter()
        .copied()
        .chain(std::iter::once(address))
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUTES: &str = r#"<?php

Route::get('/', view('default'))->name('homepage');

Route::toGroup()->prefix('/api');
    Route::post('users/', 'x')->name('api.users')->controller(UserController::class, 'store');
    Route::toGroup()->prefix('v2');
        Route::match(['get', "POST"], '/items', 'x');
    Route::endGroup();
    Route::any('ping');
Route::endGroup();

Route::delete('/item/{id}')->controller('App\Controllers\ItemController');
"#;

    #[test]
    fn test_extract_routes_with_groups() {
        let routes = extract_routes(ROUTES, "routes/map.php");
        let addresses: Vec<_> = routes.iter().map(|r| r.full_address.as_str()).collect();
        assert_eq!(
            addresses,
            vec!["/", "/api/users", "/api/v2/items", "/api/ping", "/item/{id}"]
        );
        assert_eq!(routes[0].name.as_deref(), Some("homepage"));
        assert_eq!(routes[0].methods, vec!["GET"]);
        assert_eq!(routes[1].address, "users/");
        assert_eq!(routes[1].controller.as_deref(), Some("UserController::store"));
        assert_eq!(routes[2].methods, vec!["GET", "POST"]);
        assert_eq!(routes[3].methods, vec!["ANY"]);
        assert_eq!(
            routes[4].controller.as_deref(),
            Some("App\\Controllers\\ItemController")
        );
        assert!(routes.iter().all(|r| r.file == "routes/map.php"));
    }

    #[test]
    fn test_route_range_is_address_literal() {
        let routes = extract_routes("<?php\nRoute::get('/about', 'x');\n", "routes/map.php");
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].range, (1, 12, 1, 18));
    }

    #[test]
    fn test_other_classes_ignored() {
        let routes = extract_routes("<?php\nRouter::get('/a');\nRoute::get($address);\n", "routes/map.php");
        assert!(routes.is_empty());
    }

    #[test]
    fn test_join_address() {
        assert_eq!(join_address(&[], "/"), "/");
        assert_eq!(join_address(&[], ""), "/");
        assert_eq!(join_address(&["/api/", "v1"], "/x/"), "/api/v1/x");
    }

    #[test]
    fn test_address_index() {
        assert_eq!(address_index("get"), Some(0));
        assert_eq!(address_index("ANY"), Some(0));
        assert_eq!(address_index("match"), Some(1));
        assert_eq!(address_index("name"), None);
    }

    #[test]
    fn test_is_route_file() {
        assert!(is_route_file("routes/map.php"));
        assert!(is_route_file("routes/api/v1.php"));
        assert!(!is_route_file("app/routes.php"));
        assert!(!is_route_file("routes/readme.md"));
    }
}
