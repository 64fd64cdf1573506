use indexmap::IndexMap;
use tracing::debug;

use super::core::{FilterMapping, FilterTarget, InvocationDescriptor, InvocationResolver};
use crate::exchange::DispatcherType;

/// Default resolver.
///
/// Handler patterns, in precedence order:
///
/// | Pattern    | Matches                          | servlet path | path info |
/// |------------|----------------------------------|--------------|-----------|
/// | `/a/b`     | exactly `/a/b`                   | `/a/b`       | none      |
/// | `/a/*`     | `/a` and everything below it     | `/a`         | remainder |
/// | `*.ext`    | paths ending in `.ext`           | full path    | none      |
/// | `/`        | anything else                    | full path    | none      |
///
/// Among prefix patterns the longest prefix wins. Filter URL patterns use the
/// same syntax; `/` and `/*` match every path.
#[derive(Debug, Clone, Default)]
pub struct SimpleMapper {
    handler_mappings: IndexMap<String, String>,
    filter_mappings: Vec<FilterMapping>,
}

impl SimpleMapper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn match_handler(&self, path: &str) -> Option<(String, String, Option<String>)> {
        if let Some(handler) = self.handler_mappings.get(path) {
            if !is_wildcard(path) {
                return Some((handler.clone(), path.to_string(), None));
            }
        }

        let mut best: Option<(&str, &String)> = None;
        for (pattern, handler) in &self.handler_mappings {
            if let Some(prefix) = pattern.strip_suffix("/*") {
                if prefix_matches(prefix, path)
                    && best.map_or(true, |(current, _)| prefix.len() > current.len())
                {
                    best = Some((prefix, handler));
                }
            }
        }
        if let Some((prefix, handler)) = best {
            let rest = &path[prefix.len()..];
            let path_info = (!rest.is_empty()).then(|| rest.to_string());
            return Some((handler.clone(), prefix.to_string(), path_info));
        }

        for (pattern, handler) in &self.handler_mappings {
            if let Some(ext) = pattern.strip_prefix("*.") {
                if path.rsplit('/').next().is_some_and(|last| {
                    last.rsplit_once('.').is_some_and(|(_, e)| e == ext)
                }) {
                    return Some((handler.clone(), path.to_string(), None));
                }
            }
        }

        self.handler_mappings
            .get("/")
            .map(|handler| (handler.clone(), path.to_string(), None))
    }

    fn filter_chain(
        &self,
        dispatcher_type: DispatcherType,
        path: Option<&str>,
        handler_name: &str,
    ) -> Vec<String> {
        let mut chain: Vec<String> = Vec::new();
        for mapping in &self.filter_mappings {
            if !mapping.applies_to(dispatcher_type) || chain.contains(&mapping.filter_name) {
                continue;
            }
            let hit = match &mapping.target {
                FilterTarget::UrlPattern(pattern) => {
                    path.is_some_and(|p| url_pattern_matches(pattern, p))
                }
                FilterTarget::HandlerName(name) => name == handler_name || name == "*",
            };
            if hit {
                chain.push(mapping.filter_name.clone());
            }
        }
        chain
    }
}

fn is_wildcard(pattern: &str) -> bool {
    pattern.ends_with("/*") || pattern.starts_with("*.")
}

fn prefix_matches(prefix: &str, path: &str) -> bool {
    prefix.is_empty()
        || path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn url_pattern_matches(pattern: &str, path: &str) -> bool {
    if pattern == "/" || pattern == "/*" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix("/*") {
        return prefix_matches(prefix, path);
    }
    if let Some(ext) = pattern.strip_prefix("*.") {
        return path.ends_with(&format!(".{ext}"));
    }
    pattern == path
}

impl InvocationResolver for SimpleMapper {
    fn resolve(
        &self,
        dispatcher_type: DispatcherType,
        servlet_path: &str,
        path_info: Option<&str>,
    ) -> Option<InvocationDescriptor> {
        let mut path = format!("{servlet_path}{}", path_info.unwrap_or(""));
        if path.is_empty() {
            path.push('/');
        }
        let (handler_name, servlet_path, path_info) = self.match_handler(&path)?;
        let filter_names = self.filter_chain(dispatcher_type, Some(&path), &handler_name);
        debug!(
            path = %path,
            handler_name = %handler_name,
            dispatcher_type = %dispatcher_type,
            filters = filter_names.len(),
            "Resolved invocation"
        );
        Some(InvocationDescriptor {
            handler_name,
            servlet_path,
            path_info,
            filter_names,
        })
    }

    fn resolve_named(
        &self,
        dispatcher_type: DispatcherType,
        handler_name: &str,
    ) -> Option<InvocationDescriptor> {
        Some(InvocationDescriptor {
            handler_name: handler_name.to_string(),
            servlet_path: format!("/{handler_name}"),
            path_info: None,
            filter_names: self.filter_chain(dispatcher_type, None, handler_name),
        })
    }

    fn add_handler_mapping(&mut self, handler_name: &str, patterns: &[&str]) -> Vec<String> {
        let mut conflicts = Vec::new();
        for pattern in patterns {
            match self.handler_mappings.get(*pattern) {
                Some(existing) if existing != handler_name => conflicts.push(pattern.to_string()),
                Some(_) => {}
                None => {
                    self.handler_mappings
                        .insert(pattern.to_string(), handler_name.to_string());
                }
            }
        }
        conflicts
    }

    fn add_filter_mapping(&mut self, mapping: FilterMapping) {
        self.filter_mappings.push(mapping);
    }

    fn mappings(&self, handler_name: &str) -> Vec<String> {
        self.handler_mappings
            .iter()
            .filter(|(_, handler)| handler.as_str() == handler_name)
            .map(|(pattern, _)| pattern.clone())
            .collect()
    }

    fn remove_handler(&mut self, handler_name: &str) {
        self.handler_mappings
            .retain(|_, handler| handler.as_str() != handler_name);
    }

    fn reset(&mut self) {
        self.handler_mappings.clear();
        self.filter_mappings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> SimpleMapper {
        let mut m = SimpleMapper::new();
        m.add_handler_mapping("exact", &["/a/b"]);
        m.add_handler_mapping("prefix", &["/a/*"]);
        m.add_handler_mapping("deep", &["/a/b/c/*"]);
        m.add_handler_mapping("ext", &["*.jsp"]);
        m.add_handler_mapping("default", &["/"]);
        m
    }

    #[test]
    fn test_precedence() {
        let m = mapper();
        let d = m.resolve(DispatcherType::Request, "/a/b", None).unwrap();
        assert_eq!(d.handler_name, "exact");
        assert_eq!(d.path_info, None);

        let d = m.resolve(DispatcherType::Request, "/a/x/y", None).unwrap();
        assert_eq!(d.handler_name, "prefix");
        assert_eq!(d.servlet_path, "/a");
        assert_eq!(d.path_info.as_deref(), Some("/x/y"));

        let d = m.resolve(DispatcherType::Request, "/a/b/c/d", None).unwrap();
        assert_eq!(d.handler_name, "deep");

        let d = m.resolve(DispatcherType::Request, "/index.jsp", None).unwrap();
        assert_eq!(d.handler_name, "ext");

        let d = m.resolve(DispatcherType::Request, "/other", None).unwrap();
        assert_eq!(d.handler_name, "default");
        assert_eq!(d.servlet_path, "/other");

        // "/ab" is not under "/a"
        let d = m.resolve(DispatcherType::Request, "/ab", None).unwrap();
        assert_eq!(d.handler_name, "default");
    }

    #[test]
    fn test_miss_without_default() {
        let mut m = SimpleMapper::new();
        m.add_handler_mapping("echo", &["/echo"]);
        assert!(m.resolve(DispatcherType::Request, "/nope", None).is_none());
    }

    #[test]
    fn test_conflicting_pattern_is_reported() {
        let mut m = SimpleMapper::new();
        assert!(m.add_handler_mapping("one", &["/x"]).is_empty());
        assert_eq!(m.add_handler_mapping("two", &["/x", "/y"]), vec!["/x"]);
        assert_eq!(m.mappings("two"), vec!["/y"]);
        m.remove_handler("one");
        assert!(m.mappings("one").is_empty());
    }

    #[test]
    fn test_filter_chain_respects_dispatcher_type_and_order() {
        let mut m = SimpleMapper::new();
        m.add_handler_mapping("echo", &["/echo"]);
        m.add_filter_mapping(FilterMapping {
            filter_name: "all".into(),
            target: FilterTarget::UrlPattern("/*".into()),
            dispatcher_types: vec![DispatcherType::Request, DispatcherType::Forward],
        });
        m.add_filter_mapping(FilterMapping {
            filter_name: "named".into(),
            target: FilterTarget::HandlerName("echo".into()),
            dispatcher_types: vec![],
        });
        m.add_filter_mapping(FilterMapping {
            filter_name: "include-only".into(),
            target: FilterTarget::UrlPattern("/echo".into()),
            dispatcher_types: vec![DispatcherType::Include],
        });

        let d = m.resolve(DispatcherType::Request, "/echo", None).unwrap();
        assert_eq!(d.filter_names, vec!["all", "named"]);
        let d = m.resolve(DispatcherType::Forward, "/echo", None).unwrap();
        assert_eq!(d.filter_names, vec!["all"]);
        let d = m.resolve(DispatcherType::Include, "/echo", None).unwrap();
        assert_eq!(d.filter_names, vec!["include-only"]);

        let named = m.resolve_named(DispatcherType::Request, "echo").unwrap();
        assert_eq!(named.servlet_path, "/echo");
        assert_eq!(named.filter_names, vec!["named"]);
    }
}
