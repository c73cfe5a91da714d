//! User-macro expansion (spec §4.3, §4.4). The expression/macro substitution
//! engine proper is an external collaborator (non-goal, spec §1); this module
//! implements only the slice DSE and HCS need: resolving `{$NAME[:context]}`
//! tokens against a host's macro scope with global fallback, because DSE's
//! comparators must compare *post-expansion* values (spec §4.4) and HCS
//! renders item keys/trigger expressions the same way.
//!
//! Resolution order, narrowest to widest (mirrors `expression.c`'s
//! `get_value_from_macro_cache` host/template/global cascade, simplified to
//! the host+global two-tier model spec.md actually asks for):
//! 1. host macro matching `name` *and* `context` exactly,
//! 2. host macro matching `name` with no context,
//! 3. global macro matching `name` and `context`,
//! 4. global macro matching `name` with no context,
//! 5. left unexpanded (token passed through verbatim).

use crate::cc::model::{GlobalMacro, HostMacro, Id};
use regex::Regex;
use std::sync::OnceLock;

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\$([A-Za-z0-9_.]+)(?::([^}]*))?\}").unwrap())
}

pub struct MacroScope<'a> {
    pub host_ids: &'a [Id],
    pub host_macros: &'a [HostMacro],
    pub global_macros: &'a [GlobalMacro],
}

impl<'a> MacroScope<'a> {
    fn resolve_one(&self, name: &str, context: Option<&str>) -> Option<&'a str> {
        let by_host = |hm: &&HostMacro| {
            self.host_ids.contains(&hm.hostid)
                && &*hm.name == name
                && hm.context.as_deref() == context
        };
        if let Some(hm) = self.host_macros.iter().find(by_host) {
            return Some(hm.value.as_ref());
        }
        if context.is_some() {
            let fallback = |hm: &&HostMacro| {
                self.host_ids.contains(&hm.hostid) && &*hm.name == name && hm.context.is_none()
            };
            if let Some(hm) = self.host_macros.iter().find(fallback) {
                return Some(hm.value.as_ref());
            }
        }
        let by_global =
            |gm: &&GlobalMacro| &*gm.name == name && gm.context.as_deref() == context;
        if let Some(gm) = self.global_macros.iter().find(by_global) {
            return Some(gm.value.as_ref());
        }
        if context.is_some() {
            let fallback = |gm: &&GlobalMacro| &*gm.name == name && gm.context.is_none();
            if let Some(gm) = self.global_macros.iter().find(fallback) {
                return Some(gm.value.as_ref());
            }
        }
        None
    }

    /// Expand every `{$NAME[:context]}` token in `text`. Tokens with no
    /// matching macro anywhere in scope are left verbatim, matching the
    /// reference's "best effort" substitution behaviour.
    pub fn expand(&self, text: &str) -> String {
        token_re()
            .replace_all(text, |caps: &regex::Captures| {
                let name = &caps[1];
                let context = caps.get(2).map(|m| m.as_str());
                match self.resolve_one(name, context) {
                    Some(v) => v.to_string(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// True if `text` contains at least one `{$...}` token — used to decide
    /// whether a raw row value needs expansion before comparison at all.
    pub fn has_macro(text: &str) -> bool {
        token_re().is_match(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn arc(s: &str) -> Arc<str> {
        Arc::from(s)
    }

    #[test]
    fn host_macro_overrides_global() {
        let host_macros = vec![HostMacro {
            hostmacroid: 1,
            hostid: 10,
            name: arc("T"),
            context: None,
            value: arc("60s"),
        }];
        let global_macros = vec![GlobalMacro {
            globalmacroid: 1,
            name: arc("T"),
            context: None,
            value: arc("300s"),
        }];
        let scope = MacroScope {
            host_ids: &[10],
            host_macros: &host_macros,
            global_macros: &global_macros,
        };
        assert_eq!(scope.expand("{$T}"), "60s");
    }

    #[test]
    fn falls_back_to_global_when_host_macro_absent() {
        let host_macros: Vec<HostMacro> = vec![];
        let global_macros = vec![GlobalMacro {
            globalmacroid: 1,
            name: arc("T"),
            context: None,
            value: arc("300s"),
        }];
        let scope = MacroScope {
            host_ids: &[10],
            host_macros: &host_macros,
            global_macros: &global_macros,
        };
        assert_eq!(scope.expand("item delay is {$T}"), "item delay is 300s");
    }

    #[test]
    fn unresolvable_token_passes_through() {
        let scope = MacroScope {
            host_ids: &[10],
            host_macros: &[],
            global_macros: &[],
        };
        assert_eq!(scope.expand("{$UNKNOWN}"), "{$UNKNOWN}");
    }

    #[test]
    fn context_variant_prefers_exact_match() {
        let host_macros = vec![
            HostMacro {
                hostmacroid: 1,
                hostid: 10,
                name: arc("IF"),
                context: None,
                value: arc("eth0"),
            },
            HostMacro {
                hostmacroid: 2,
                hostid: 10,
                name: arc("IF"),
                context: Some(arc("wan")),
                value: arc("eth1"),
            },
        ];
        let scope = MacroScope {
            host_ids: &[10],
            host_macros: &host_macros,
            global_macros: &[],
        };
        assert_eq!(scope.expand("{$IF:wan}"), "eth1");
        assert_eq!(scope.expand("{$IF}"), "eth0");
    }
}
