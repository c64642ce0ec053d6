//! Parsing of `Action: <name>: <input>` directives out of planner output.

const PREFIX: &str = "Action: ";
const SEPARATOR: &str = ": ";

/// What the planner asked for in one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// No line matched; the planner is done.
    NoAction,
    /// The first matching line.
    Action { name: String, input: String },
}

fn is_action_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_line(line: &str) -> Option<Directive> {
    let rest = line.strip_prefix(PREFIX)?;
    let (name, input) = rest.split_once(SEPARATOR)?;
    is_action_name(name).then(|| Directive::Action {
        name: name.to_string(),
        input: input.to_string(),
    })
}

/// Scans `output` line by line and returns the first directive found.
///
/// A line matches only if it starts exactly with `Action: `, followed by a
/// name made of ASCII letters, digits or `_`, then `: `. Everything after
/// that separator is the input, verbatim. Any later directives in the same
/// output are ignored.
pub fn parse_directive(output: &str) -> Directive {
    output
        .lines()
        .find_map(parse_line)
        .unwrap_or(Directive::NoAction)
}
