//! Which framework meaning a call argument carries.
//!
//! Every feature (hover, definition, completion, links, hints) starts by
//! asking `argument_roles` what the argument under the cursor is.

use hleb_lsp_parser::calls::{CallSite, Callee, ClassRef, Receiver};
use hleb_lsp_parser::literal::{check_option, check_string, check_value, strip_quotes};
use hleb_lsp_types::{PathMode, PathOptions};

use crate::routes::{address_index, ROUTE_CLASS};

pub const SETTINGS_CLASS: &str = "Hleb\\Static\\Settings";
pub const REQUEST_CLASS: &str = "Hleb\\Static\\Request";
pub const PATH_CLASS: &str = "Hleb\\Static\\Path";
pub const VIEW_CLASS: &str = "Hleb\\Static\\View";
pub const TEMPLATE_CLASS: &str = "Hleb\\Static\\Template";
pub const ROUTER_CLASS: &str = "Hleb\\Static\\Router";
pub const CONTAINER_CLASS: &str = "Hleb\\Static\\Container";

const CONFIG_FUNCTIONS: &[&str] = &["hl_config", "config", "get_config_or_fail"];
const SETTINGS_METHODS: &[&str] = &["getParam", "common", "main", "database", "system"];
const REQUEST_METHODS: &[&str] = &["param", "get", "post"];
const VIEW_FUNCTIONS: &[&str] = &["view", "template", "insertTemplate", "insertCacheTemplate"];
const TEMPLATE_METHODS: &[&str] = &["get", "insert", "insertCache"];
const PATH_METHODS: &[&str] = &["exists", "contents", "put", "getReal", "get", "isDir"];
const PATH_FUNCTIONS: &[&str] = &[
    "hl_path",
    "hl_realpath",
    "hl_file_exists",
    "hl_file_get_contents",
    "hl_file_put_contents",
    "hl_is_dir",
];
const ROUTE_NAME_FUNCTIONS: &[&str] = &["url", "address"];

/// Where a request parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestSource {
    /// Dynamic route part, `param('id')`.
    Route,
    Get,
    Post,
}

/// Meaning of one call argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentRole {
    /// File or directory path.
    Path(PathOptions),
    /// View template name.
    View,
    /// Config name (`'main'`); `key` is the parameter asked for, if any.
    ConfigName { key: Option<String> },
    /// Parameter key inside the `config` file group.
    ConfigKey { config: String },
    /// Address of a route declaration.
    RouteAddress,
    /// Group prefix of routes.
    RoutePrefix,
    RequestParam(RequestSource),
    /// Name of a declared route.
    RouteName,
}

/// Roles of argument `index` of `call`.
///
/// Hover and definition (`completing == false`) only accept complete
/// literals. While completing the literal may still be empty.
pub fn argument_roles(call: &CallSite, index: usize, completing: bool) -> Vec<ArgumentRole> {
    let Some(argument) = call.argument(index) else {
        return Vec::new();
    };
    let option = || match &argument.string {
        Some(s) if completing => check_option(&format!("'{}_'", s.value)),
        _ => check_option(&argument.text),
    };

    let mut roles = Vec::new();
    match &call.callee {
        Callee::Function(_) => function_roles(call, index, &mut roles),
        Callee::StaticMethod { class, method } => {
            static_roles(call, class, method, index, &mut roles)
        }
        Callee::Method { receiver, method } => {
            method_roles(call, receiver, method, index, &mut roles)
        }
    }

    // Any method call taking an alias path.
    let is_method = call.method_name().is_some();
    let alias_literal = argument.string.as_ref().is_some_and(|s| s.value.starts_with('@'));
    if is_method && alias_literal && !roles.iter().any(|r| matches!(r, ArgumentRole::Path(_))) {
        let is_dir = call.method_name().is_some_and(|m| m.eq_ignore_ascii_case("isDir"));
        roles.push(ArgumentRole::Path(PathOptions {
            mode: if is_dir { PathMode::Directories } else { PathMode::Files },
            alias_only: true,
        }));
    }

    roles.retain(|role| match role {
        ArgumentRole::ConfigKey { .. } if !completing => check_value(&argument.text),
        ArgumentRole::RequestParam(_) => true,
        _ => option(),
    });
    roles
}

fn function_roles(call: &CallSite, index: usize, roles: &mut Vec<ArgumentRole>) {
    if call.is_function(CONFIG_FUNCTIONS) {
        config_pair_roles(call, index, roles);
    } else if call.is_function(&["setting"]) && index == 0 {
        roles.push(ArgumentRole::ConfigKey {
            config: "main".to_string(),
        });
    } else if call.is_function(&["hl_db_config"]) && index == 0 {
        roles.push(ArgumentRole::ConfigKey {
            config: "database".to_string(),
        });
    } else if call.is_function(&["param"]) && index == 0 {
        roles.push(ArgumentRole::RequestParam(RequestSource::Route));
    } else if call.is_function(PATH_FUNCTIONS) && index == 0 {
        let mode = if call.is_function(&["hl_is_dir"]) {
            PathMode::Directories
        } else if call.is_function(&["hl_path", "hl_realpath", "hl_file_exists"]) {
            PathMode::FilesAndDirectories
        } else {
            PathMode::Files
        };
        roles.push(ArgumentRole::Path(PathOptions {
            mode,
            alias_only: false,
        }));
    } else if call.is_function(VIEW_FUNCTIONS) && index == 0 {
        roles.push(ArgumentRole::View);
        roles.push(ArgumentRole::Path(PathOptions {
            mode: PathMode::Files,
            alias_only: true,
        }));
    } else if call.is_function(ROUTE_NAME_FUNCTIONS) && index == 0 {
        roles.push(ArgumentRole::RouteName);
    }
}

fn static_roles(call: &CallSite, class: &ClassRef, method: &str, index: usize, roles: &mut Vec<ArgumentRole>) {
    let is = |names: &[&str]| names.iter().any(|n| n.eq_ignore_ascii_case(method));

    if class.is(SETTINGS_CLASS) && is(SETTINGS_METHODS) {
        settings_roles(call, method, index, roles);
    } else if class.is(REQUEST_CLASS) && is(REQUEST_METHODS) {
        request_roles(call, method, index, roles);
    } else if class.is(PATH_CLASS) && is(PATH_METHODS) && index == 0 {
        let mode = if is(&["isDir"]) {
            PathMode::Directories
        } else if is(&["getReal", "get", "exists"]) {
            PathMode::FilesAndDirectories
        } else {
            PathMode::Files
        };
        roles.push(ArgumentRole::Path(PathOptions {
            mode,
            alias_only: false,
        }));
    } else if ((class.is(VIEW_CLASS) && is(&["view"])) || (class.is(TEMPLATE_CLASS) && is(TEMPLATE_METHODS)))
        && index == 0
    {
        roles.push(ArgumentRole::View);
    } else if class.is(ROUTER_CLASS) && is(ROUTE_NAME_FUNCTIONS) && index == 0 {
        roles.push(ArgumentRole::RouteName);
    } else if class.is(ROUTE_CLASS) && address_index(method) == Some(index) {
        roles.push(ArgumentRole::RouteAddress);
    }
}

fn method_roles(call: &CallSite, receiver: &Receiver, method: &str, index: usize, roles: &mut Vec<ArgumentRole>) {
    let is = |names: &[&str]| names.iter().any(|n| n.eq_ignore_ascii_case(method));

    if is(SETTINGS_METHODS) && is_container_service(receiver, "Setting", "settings") {
        settings_roles(call, method, index, roles);
    } else if is(REQUEST_METHODS) && is_container_service(receiver, "Request", "request") {
        request_roles(call, method, index, roles);
    } else if is(&["prefix"]) && call.arguments.len() == 1 && is_route_chain(call) {
        roles.push(ArgumentRole::RoutePrefix);
    }
}

fn config_pair_roles(call: &CallSite, index: usize, roles: &mut Vec<ArgumentRole>) {
    match index {
        0 => roles.push(ArgumentRole::ConfigName {
            key: call.argument(1).map(|a| strip_quotes(&a.text).to_string()),
        }),
        1 => {
            let Some(name) = call.argument(0) else {
                return;
            };
            if name.string.is_some() && check_string(&name.text) {
                roles.push(ArgumentRole::ConfigKey {
                    config: strip_quotes(&name.text).to_string(),
                });
            }
        }
        _ => {}
    }
}

fn settings_roles(call: &CallSite, method: &str, index: usize, roles: &mut Vec<ArgumentRole>) {
    if method.eq_ignore_ascii_case("getParam") {
        config_pair_roles(call, index, roles);
    } else if index == 0 {
        roles.push(ArgumentRole::ConfigKey {
            config: method.to_ascii_lowercase(),
        });
    }
}

fn request_roles(call: &CallSite, method: &str, index: usize, roles: &mut Vec<ArgumentRole>) {
    if call.arguments.len() != 1 || index != 0 {
        return;
    }
    let source = match method.to_ascii_lowercase().as_str() {
        "get" => RequestSource::Get,
        "post" => RequestSource::Post,
        _ => RequestSource::Route,
    };
    roles.push(ArgumentRole::RequestParam(source));
}

/// The chain this call belongs to starts at `Route::...`.
fn is_route_chain(call: &CallSite) -> bool {
    call.chain_root()
        .static_call()
        .is_some_and(|(class, _)| class.written.trim_start_matches('\\') == ROUTE_CLASS)
}

/// Whether `receiver` is the framework service `service` (short name such as
/// `Request`) obtained from the container, or through its `shortcut`:
///
/// - `$this->container->get(X::class)` or `Container::get(X::class)`;
/// - `$this->shortcut()`;
/// - `$this->container->shortcut()`.
pub fn is_container_service(receiver: &Receiver, service: &str, shortcut: &str) -> bool {
    let Receiver::Call(inner) = receiver else {
        return false;
    };
    let Some(method) = inner.method_name() else {
        return false;
    };

    // Method names are matched exactly as the framework declares them.
    if method == shortcut && inner.arguments.is_empty() {
        return match inner.receiver() {
            Some(Receiver::Variable(v)) => v == "this",
            Some(r) => is_this_container(r),
            None => false,
        };
    }

    if method != "get" || inner.arguments.len() != 1 {
        return false;
    }
    let from_container = match (inner.static_call(), inner.receiver()) {
        (Some((class, _)), _) => class.is(CONTAINER_CLASS),
        (None, Some(r)) => is_this_container(r),
        (None, None) => false,
    };
    from_container
        && inner
            .argument(0)
            .and_then(|a| a.class_constant.as_ref())
            .is_some_and(|class| is_service_class(class, service))
}

fn is_this_container(receiver: &Receiver) -> bool {
    matches!(
        receiver,
        Receiver::Property { object, name }
            if name == "container" && **object == Receiver::Variable("this".to_string())
    )
}

fn is_service_class(class: &ClassRef, service: &str) -> bool {
    let interface = format!("{}Interface", service);
    if class.is_bare() {
        let short = class.short_name();
        if short.eq_ignore_ascii_case(service) || short.eq_ignore_ascii_case(&interface) {
            return true;
        }
    }
    class.is(&format!("Hleb\\Reference\\{}", interface))
        || class.is(&format!("Hleb\\Reference\\Interface\\{}", service))
        || class.is(&format!("Hleb\\Reference\\{}", service))
}

/// Output of a debugging function left in the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugHint {
    /// `var_dump`, `dd`, `dump`, `print_r`: probably left over.
    Reminder,
    /// `var_export`, `print_r2`: informational.
    Info,
}

impl DebugHint {
    pub fn message(self) -> &'static str {
        match self {
            DebugHint::Reminder => "HLEB2 Hint: Make sure this debugging function is still needed in the code.",
            DebugHint::Info => "HLEB2 Info: Output of debugging information.",
        }
    }
}

/// Hint for argument `index` of a debugging function call.
pub fn debug_hint(call: &CallSite, index: usize) -> Option<DebugHint> {
    if index >= call.arguments.len() {
        return None;
    }
    if call.is_function(&["var_dump", "dd", "var_dump2", "dump"]) {
        return Some(DebugHint::Reminder);
    }
    if call.is_function(&["print_r"]) && index == 0 {
        return Some(DebugHint::Reminder);
    }
    if call.is_function(&["var_export", "print_r2"]) {
        return Some(DebugHint::Info);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use hleb_lsp_parser::calls::collect_call_sites;
    use hleb_lsp_parser::parser::FileParser;
    use hleb_lsp_parser::symbols::extract_file_symbols;

    fn calls(code: &str) -> Vec<CallSite> {
        let parser = FileParser::from_source(code);
        let tree = parser.tree().unwrap();
        let symbols = extract_file_symbols(tree, code);
        collect_call_sites(tree, code, &symbols)
    }

    /// Roles of argument `index` of the call whose method or function is `name`.
    fn roles_of(code: &str, name: &str, index: usize) -> Vec<ArgumentRole> {
        let calls = calls(code);
        let call = calls
            .iter()
            .find(|c| c.function_name().or(c.method_name()) == Some(name))
            .unwrap();
        argument_roles(call, index, false)
    }

    #[test]
    fn test_config_functions() {
        let code = "<?php\nhl_config('main', 'debug');\n";
        assert_eq!(
            roles_of(code, "hl_config", 0),
            vec![ArgumentRole::ConfigName {
                key: Some("debug".to_string())
            }]
        );
        assert_eq!(
            roles_of(code, "hl_config", 1),
            vec![ArgumentRole::ConfigKey {
                config: "main".to_string()
            }]
        );
        assert_eq!(
            roles_of("<?php\nsetting('timezone');\n", "setting", 0),
            vec![ArgumentRole::ConfigKey {
                config: "main".to_string()
            }]
        );
        assert_eq!(
            roles_of("<?php\nhl_db_config('base.db.type');\n", "hl_db_config", 0),
            vec![ArgumentRole::ConfigKey {
                config: "database".to_string()
            }]
        );
    }

    #[test]
    fn test_config_key_accepts_values() {
        assert_eq!(
            roles_of("<?php\nconfig('main', 42);\n", "config", 1),
            vec![ArgumentRole::ConfigKey {
                config: "main".to_string()
            }]
        );
        assert!(roles_of("<?php\nconfig('main', $key);\n", "config", 1).is_empty());
        assert!(roles_of("<?php\nconfig($name, 'debug');\n", "config", 1).is_empty());
    }

    #[test]
    fn test_settings_static_and_container() {
        let code = "<?php\nuse Hleb\\Static\\Settings;\nSettings::common('debug');\n";
        assert_eq!(
            roles_of(code, "common", 0),
            vec![ArgumentRole::ConfigKey {
                config: "common".to_string()
            }]
        );

        let code = "<?php\n$this->settings()->getParam('system', 'origin.request');\n";
        assert_eq!(
            roles_of(code, "getParam", 1),
            vec![ArgumentRole::ConfigKey {
                config: "system".to_string()
            }]
        );

        let code = "<?php\nuse Hleb\\Reference\\SettingInterface;\n$this->container->get(SettingInterface::class)->main('x');\n";
        assert_eq!(
            roles_of(code, "main", 0),
            vec![ArgumentRole::ConfigKey {
                config: "main".to_string()
            }]
        );

        let code = "<?php\nuse Other\\Settings;\nSettings::common('debug');\n";
        assert!(roles_of(code, "common", 0).is_empty());
    }

    #[test]
    fn test_request_params() {
        assert_eq!(
            roles_of("<?php\nparam('id');\n", "param", 0),
            vec![ArgumentRole::RequestParam(RequestSource::Route)]
        );
        let code = "<?php\nuse Hleb\\Static\\Request;\nRequest::post('name');\n";
        assert_eq!(
            roles_of(code, "post", 0),
            vec![ArgumentRole::RequestParam(RequestSource::Post)]
        );
        let code = "<?php\n$this->container->request()->get('page');\n";
        assert_eq!(
            roles_of(code, "get", 0),
            vec![ArgumentRole::RequestParam(RequestSource::Get)]
        );
        let code = "<?php\nuse Hleb\\Static\\Request;\nRequest::get('page', 1);\n";
        assert!(roles_of(code, "get", 0).is_empty());
        // Hover is shown for any argument text.
        assert_eq!(
            roles_of("<?php\nparam($name);\n", "param", 0),
            vec![ArgumentRole::RequestParam(RequestSource::Route)]
        );
    }

    #[test]
    fn test_path_roles() {
        let code = "<?php\nhl_is_dir('@storage/logs');\n";
        assert_eq!(
            roles_of(code, "hl_is_dir", 0),
            vec![ArgumentRole::Path(PathOptions {
                mode: PathMode::Directories,
                alias_only: false,
            })]
        );
        let code = "<?php\nuse Hleb\\Static\\Path;\nPath::contents('@storage/x.txt');\n";
        assert_eq!(
            roles_of(code, "contents", 0),
            vec![ArgumentRole::Path(PathOptions {
                mode: PathMode::Files,
                alias_only: false,
            })]
        );
        let code = "<?php\n$fs->isDir('@storage/logs');\n";
        assert_eq!(
            roles_of(code, "isDir", 0),
            vec![ArgumentRole::Path(PathOptions {
                mode: PathMode::Directories,
                alias_only: true,
            })]
        );
        assert!(roles_of("<?php\n$fs->read('storage/logs');\n", "read", 0).is_empty());
    }

    #[test]
    fn test_view_roles() {
        assert_eq!(
            roles_of("<?php\nview('index');\n", "view", 0),
            vec![
                ArgumentRole::View,
                ArgumentRole::Path(PathOptions {
                    mode: PathMode::Files,
                    alias_only: true,
                })
            ]
        );
        let code = "<?php\nuse Hleb\\Static\\Template;\nTemplate::insert('parts/header');\n";
        assert_eq!(roles_of(code, "insert", 0), vec![ArgumentRole::View]);
    }

    #[test]
    fn test_route_roles() {
        let code = "<?php\nRoute::match(['get'], '/x', 'y');\n";
        assert!(roles_of(code, "match", 0).is_empty());
        assert_eq!(roles_of(code, "match", 1), vec![ArgumentRole::RouteAddress]);

        let code = "<?php\nRoute::toGroup()->prefix('/api');\n";
        assert_eq!(roles_of(code, "prefix", 0), vec![ArgumentRole::RoutePrefix]);

        let code = "<?php\n$builder->prefix('/api');\n";
        assert!(roles_of(code, "prefix", 0).is_empty());

        assert_eq!(
            roles_of("<?php\nurl('homepage');\n", "url", 0),
            vec![ArgumentRole::RouteName]
        );
    }

    #[test]
    fn test_completing_accepts_empty_literal() {
        let calls = calls("<?php\nsetting('');\n");
        assert!(argument_roles(&calls[0], 0, false).is_empty());
        assert_eq!(
            argument_roles(&calls[0], 0, true),
            vec![ArgumentRole::ConfigKey {
                config: "main".to_string()
            }]
        );
    }

    #[test]
    fn test_container_service_forms() {
        for code in [
            "<?php\n$this->container->get(RequestInterface::class)->get('a');\n",
            "<?php\n$this->container->get(Request::class)->get('a');\n",
            "<?php\nuse Hleb\\Reference\\Interface\\Request;\n$this->container->get(Request::class)->get('a');\n",
            "<?php\nuse Hleb\\Static\\Container;\nContainer::get(\\Hleb\\Reference\\Request::class)->get('a');\n",
            "<?php\n$this->request()->get('a');\n",
        ] {
            assert_eq!(
                roles_of(code, "get", 0).len(),
                1,
                "not recognised: {}",
                code
            );
        }
        for code in [
            "<?php\nuse App\\RequestInterface;\n$this->container->get(RequestInterface::class)->get('a');\n",
            "<?php\nContainer::get(Request::class)->get('a');\n",
            "<?php\n$other->request()->get('a');\n",
            "<?php\n$this->Request()->get('a');\n",
            "<?php\n$this->container->GET(Request::class)->get('a');\n",
        ] {
            let calls = calls(code);
            let outer = calls.iter().find(|c| c.arguments.first().is_some_and(|a| a.string.is_some())).unwrap();
            assert!(argument_roles(outer, 0, false).is_empty(), "recognised: {}", code);
        }
    }

    #[test]
    fn test_debug_hints() {
        let calls = calls("<?php\nvar_dump($a, $b);\nprint_r($x, true);\nvar_export($y);\nstrlen($z);\n");
        assert_eq!(debug_hint(&calls[0], 1), Some(DebugHint::Reminder));
        assert_eq!(debug_hint(&calls[1], 0), Some(DebugHint::Reminder));
        assert_eq!(debug_hint(&calls[1], 1), None);
        assert_eq!(debug_hint(&calls[2], 0), Some(DebugHint::Info));
        assert_eq!(debug_hint(&calls[3], 0), None);
    }
}
