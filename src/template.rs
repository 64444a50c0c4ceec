// file: src/template.rs
// version: 1.1.0
// guid: 5e8d2c71-9b4a-4f3e-a6d0-1c2b3a4e5f60

//! Argument templates for external tools
//!
//! A tool is configured as a program plus a list of argument strings. Each
//! argument may contain `{name}` placeholders that are filled in per
//! invocation. Scalar placeholders (`{source}`, `{object}`, `{library}`) may
//! appear anywhere inside an argument, so `/OUT:{library}` works. List
//! placeholders (`{objects}`) must make up a whole argument and expand into
//! zero or more arguments. User variables from the `[variables]` config
//! table bind like scalars, so `-mmcu={mcu}` or `-D{build.board}` work.
//!
//! Expansion produces an argument vector. Nothing is ever joined into a shell
//! string, so paths with spaces or shell metacharacters stay literal.

use crate::error::BuildError;
use crate::Result;
use regex::Regex;
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};

/// Source file placeholder
pub const SOURCE: &str = "source";
/// Object file placeholder
pub const OBJECT: &str = "object";
/// Static library placeholder
pub const LIBRARY: &str = "library";
/// Object file list placeholder
pub const OBJECTS: &str = "objects";

const PLACEHOLDER_PATTERN: &str = r"\{([A-Za-z_][A-Za-z0-9_.]*)\}";
const NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_.]*$";

fn placeholder_regex() -> Result<Regex> {
    Regex::new(PLACEHOLDER_PATTERN)
        .map_err(|e| BuildError::template(format!("Invalid placeholder pattern: {}", e)))
}

/// True when `name` can be written as a `{name}` placeholder
pub fn is_valid_name(name: &str) -> Result<bool> {
    let re = Regex::new(NAME_PATTERN)
        .map_err(|e| BuildError::template(format!("Invalid name pattern: {}", e)))?;
    Ok(re.is_match(name))
}

/// Values substituted into a template
#[derive(Debug, Default, Clone)]
pub struct Bindings {
    scalars: HashMap<String, OsString>,
    lists: HashMap<String, Vec<OsString>>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a placeholder that expands inside a single argument
    pub fn scalar(mut self, name: impl Into<String>, value: impl AsRef<OsStr>) -> Self {
        self.scalars.insert(name.into(), value.as_ref().to_os_string());
        self
    }

    /// Bind a placeholder that expands into several arguments
    pub fn list<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.lists.insert(
            name.into(),
            values.into_iter().map(|v| v.as_ref().to_os_string()).collect(),
        );
        self
    }

    /// Bind every entry of a variable table as a scalar
    pub fn variables<'a, I>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (name, value) in variables {
            self.scalars.insert(name.clone(), OsString::from(value));
        }
        self
    }
}

/// Names of all placeholders referenced by one argument
pub fn placeholders(arg: &str) -> Result<Vec<String>> {
    let re = placeholder_regex()?;
    Ok(re
        .captures_iter(arg)
        .map(|cap| cap[1].to_string())
        .collect())
}

/// Check a template against the placeholders a tool supports.
pub fn validate(args: &[String], scalars: &[&str], lists: &[&str]) -> Result<()> {
    for arg in args {
        for name in placeholders(arg)? {
            if scalars.contains(&name.as_str()) {
                continue;
            }
            if lists.contains(&name.as_str()) {
                if arg != &format!("{{{}}}", name) {
                    return Err(BuildError::template(format!(
                        "placeholder {{{}}} must be a whole argument, found '{}'",
                        name, arg
                    )));
                }
                continue;
            }
            return Err(BuildError::template(format!(
                "unknown placeholder {{{}}} in '{}'",
                name, arg
            )));
        }
    }
    Ok(())
}

/// Expand a template into an argument vector
pub fn render(args: &[String], bindings: &Bindings) -> Result<Vec<OsString>> {
    let re = placeholder_regex()?;
    let mut rendered = Vec::with_capacity(args.len());

    for arg in args {
        if let Some(cap) = re.captures(arg) {
            let whole = cap.get(0).map(|m| m.as_str() == arg.as_str()).unwrap_or(false);
            if whole {
                if let Some(values) = bindings.lists.get(&cap[1]) {
                    rendered.extend(values.iter().cloned());
                    continue;
                }
            }
        }

        let mut out = OsString::new();
        let mut last = 0;
        for cap in re.captures_iter(arg) {
            let (Some(m), Some(name)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            out.push(&arg[last..m.start()]);
            match bindings.scalars.get(name.as_str()) {
                Some(value) => out.push(value),
                None if bindings.lists.contains_key(name.as_str()) => {
                    return Err(BuildError::template(format!(
                        "list placeholder {} cannot be embedded in '{}'",
                        m.as_str(),
                        arg
                    )));
                }
                None => {
                    return Err(BuildError::template(format!(
                        "no value bound for {} in '{}'",
                        m.as_str(),
                        arg
                    )));
                }
            }
            last = m.end();
        }
        out.push(&arg[last..]);
        rendered.push(out);
    }

    Ok(rendered)
}
