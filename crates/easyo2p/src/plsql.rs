//! Best-effort PL/SQL to PL/pgSQL rewriting for trigger bodies.
//!
//! This is a heuristic, line-oriented text transform, not a parser. It
//! discards the trigger header, runs every body line through an ordered token
//! substitution table, converts the final `END;` into a `RETURN NEW;` epilogue
//! and declares loop variables that PL/SQL introduces implicitly. Constructs
//! it does not recognise pass through unmodified; the resulting function may
//! need manual correction and the transform itself never fails.
//!
//! Known limitation: end-of-block detection matches a bare `END;` line, so a
//! nested block (or a string literal) ending with the same text on its own
//! line is mistaken for the end of the trigger body.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::config::Substitution;

/// `FOR <var> IN` loop headers introduce their variable implicitly.
static LOOP_VAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*FOR\s+(\w+)\s+IN").expect("loop var regex"));

/// First `BEGIN` keyword, any case.
static BEGIN_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new("BEGIN")
        .case_insensitive(true)
        .build()
        .expect("begin regex")
});

/// Ordered literal-to-literal replacements applied to every body line.
///
/// Each rule is applied as written and again in all-lowercase, in table
/// order.
#[derive(Debug, Clone)]
pub struct SubstitutionTable {
    rules: Vec<(String, String)>,
}

impl Default for SubstitutionTable {
    fn default() -> Self {
        let rules = [
            (":OLD.", "OLD."),
            (":NEW.", "NEW."),
            ("INSERTING", "TG_OP = 'INSERT'"),
            ("UPDATING", "TG_OP = 'UPDATE'"),
            ("DELETING", "TG_OP = 'DELETE'"),
            (" NUMBER", " NUMERIC"),
            (" PLS_INTEGER", " INTEGER"),
            (" VARCHAR2", " VARCHAR"),
            ("RAISE_APPLICATION_ERROR", "CALL RAISE_APPLICATION_ERROR"),
            ("SQL%ROWCOUNT", "sql_rowcount()"),
        ];
        Self {
            rules: rules
                .iter()
                .map(|(f, t)| (f.to_string(), t.to_string()))
                .collect(),
        }
    }
}

impl SubstitutionTable {
    /// Default table extended with configured rules.
    ///
    /// A configured rule whose `from` token matches an existing rule replaces
    /// it in place; new tokens are appended in configuration order.
    pub fn with_overrides(overrides: &[Substitution]) -> Self {
        let mut table = Self::default();
        for rule in overrides {
            match table.rules.iter_mut().find(|(f, _)| *f == rule.from) {
                Some(existing) => existing.1 = rule.to.clone(),
                None => table.rules.push((rule.from.clone(), rule.to.clone())),
            }
        }
        table
    }

    /// Apply every rule to one line of code.
    pub fn apply(&self, line: &str) -> String {
        let mut text = line.to_string();
        for (from, to) in &self.rules {
            text = text.replace(from, to);
            text = text.replace(&from.to_lowercase(), to);
        }
        text
    }
}

/// Rewrite a source trigger body into a PL/pgSQL function body.
///
/// `lines` are the source lines as stored in the catalog, without trailing
/// newlines.
pub fn rewrite(lines: &[&str], subs: &SubstitutionTable) -> String {
    let mut text = String::new();
    let mut body = false;

    for raw in lines {
        let line = raw.trim_end_matches(['\r', '\n']);
        let upper = line.trim().to_uppercase();

        if !body && (upper == "DECLARE" || upper == "BEGIN") {
            body = true;
        }

        if body {
            if upper == "END;" {
                text.push_str("  RETURN NEW; \n");
            }
            text.push_str(&subs.apply(line));
            text.push('\n');
        } else if upper.ends_with(" DECLARE") {
            text.push_str("DECLARE \n");
            body = true;
        } else if upper.ends_with(" BEGIN") {
            text.push_str("BEGIN \n");
            body = true;
        }
    }

    declare_loop_variables(text)
}

/// Inject a RECORD declaration for every `FOR <var> IN` loop variable that has
/// no declaration before the first `BEGIN`, creating a DECLARE section when
/// the body starts directly with `BEGIN`.
fn declare_loop_variables(text: String) -> String {
    let header_end = BEGIN_RE.find(&text).map(|m| m.start()).unwrap_or(0);
    let header = &text[..header_end];

    let mut vars: Vec<&str> = Vec::new();
    for capture in LOOP_VAR_RE.captures_iter(&text) {
        let var = capture.get(1).expect("loop var capture").as_str();
        if vars.contains(&var) {
            continue;
        }
        let declared = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(var)))
            .map(|re| re.is_match(header))
            .unwrap_or(false);
        if !declared {
            vars.push(var);
        }
    }

    if vars.is_empty() {
        return text;
    }

    let mut declarations = vars
        .iter()
        .map(|v| format!("  {} RECORD;", v))
        .collect::<Vec<_>>()
        .join("\n");
    declarations.push_str("\nBEGIN");
    if text.to_uppercase().starts_with("BEGIN") {
        declarations = format!("\nDECLARE{}", declarations);
    }

    BEGIN_RE
        .replace(&text, regex::NoExpand(&declarations))
        .into_owned()
}

/// Wrap a rewritten body in the trigger-function header and footer.
pub fn function_ddl(function_name: &str, body: &str) -> String {
    [
        &format!("CREATE FUNCTION %%schema%%.{}()", function_name),
        "RETURNS TRIGGER",
        "LANGUAGE PLPGSQL",
        "AS",
        "$$",
        body,
        "$$; \n\n",
    ]
    .join("\n")
}
