//! Output formatting.
//!
//! The default formatter re-parses text with swc and prints it back, which
//! normalizes indentation, spacing and semicolons, then applies the quote
//! style from [`FormatOptions`]. Formatting never fails a conversion: text
//! that does not parse is returned unchanged with a warning.

use swc_core::ecma::ast::{IdentName, JSXAttrValue, PropName, Str};
use swc_core::ecma::visit::{VisitMut, VisitMutWith};
use tracing::warn;

use crate::config::{FormatOptions, QuoteProps};
use crate::detect::is_identifier_name;
use crate::syntax;

/// Style-normalizes source text.
pub trait Formatter {
    fn format(&self, text: &str, options: &FormatOptions) -> String;
}

/// Re-prints through the swc code generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SwcFormatter;

impl Formatter for SwcFormatter {
    fn format(&self, text: &str, options: &FormatOptions) -> String {
        let mut parsed = match syntax::parse(text, options.dialect) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(%err, "formatting failed, keeping unformatted output");
                return text.to_string();
            }
        };
        parsed.module.visit_mut_with(&mut StyleNormalizer { options });
        parsed.print()
    }
}

/// Returns text as given. Useful when output goes to another formatter anyway.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityFormatter;

impl Formatter for IdentityFormatter {
    fn format(&self, text: &str, _options: &FormatOptions) -> String {
        text.to_string()
    }
}

struct StyleNormalizer<'a> {
    options: &'a FormatOptions,
}

impl VisitMut for StyleNormalizer<'_> {
    fn visit_mut_str(&mut self, s: &mut Str) {
        if !self.options.single_quote || s.value.contains('\'') {
            return;
        }
        let Some(raw) = s.raw.as_deref() else {
            return;
        };
        if let Some(inner) = raw.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
            s.raw = Some(format!("'{}'", inner.replace("\\\"", "\"")).into());
        }
    }

    fn visit_mut_prop_name(&mut self, name: &mut PropName) {
        if self.options.quote_props == QuoteProps::AsNeeded {
            if let PropName::Str(key) = name {
                if is_identifier_name(&key.value) {
                    *name = PropName::Ident(IdentName::new(key.value.clone(), key.span));
                    return;
                }
            }
        }
        name.visit_mut_children_with(self);
    }

    // JSX attribute quotes are markup, not string style.
    fn visit_mut_jsx_attr_value(&mut self, value: &mut JSXAttrValue) {
        if let JSXAttrValue::JSXExprContainer(container) = value {
            container.visit_mut_with(self);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::Dialect;

    #[test]
    fn test_prefers_single_quotes() {
        let out = SwcFormatter.format("const a = \"x\";\nconst b = \"it's\";\n", &FormatOptions::default());
        assert!(out.contains("const a = 'x';"), "{out}");
        assert!(out.contains("const b = \"it's\";"), "{out}");
    }

    #[test]
    fn test_unescapes_double_quotes() {
        let out = SwcFormatter.format(r#"const a = "say \"hi\"";"#, &FormatOptions::default());
        assert!(out.contains(r#"const a = 'say "hi"';"#), "{out}");
    }

    #[test]
    fn test_unquotes_property_names_as_needed() {
        let out = SwcFormatter.format(
            "const c = { \"baseURL\": 1, \"a-b\": 2 };",
            &FormatOptions::default(),
        );
        assert!(out.contains("baseURL: 1"), "{out}");
        assert!(out.contains("\"a-b\": 2") || out.contains("'a-b': 2"), "{out}");
    }

    #[test]
    fn test_preserve_keeps_quoted_keys() {
        let options = FormatOptions {
            quote_props: QuoteProps::Preserve,
            single_quote: false,
            ..FormatOptions::default()
        };
        let out = SwcFormatter.format("const c = { \"baseURL\": 1 };", &options);
        assert!(out.contains("\"baseURL\": 1"), "{out}");
    }

    #[test]
    fn test_jsx_attributes_keep_double_quotes() {
        let options = FormatOptions {
            dialect: Dialect::Tsx,
            ..FormatOptions::default()
        };
        let out = SwcFormatter.format("const el = <a href=\"/home\">{\"x\"}</a>;", &options);
        assert!(out.contains("href=\"/home\""), "{out}");
        assert!(out.contains("{'x'}"), "{out}");
    }

    #[test]
    fn test_unparseable_text_returned_unchanged() {
        let text = "function (";
        assert_eq!(SwcFormatter.format(text, &FormatOptions::default()), text);
    }

    #[test]
    fn test_stable_on_own_output() {
        let once = SwcFormatter.format("let x = {\"a\": \"b\"}\n", &FormatOptions::default());
        let twice = SwcFormatter.format(&once, &FormatOptions::default());
        assert_eq!(once, twice);
    }
}
