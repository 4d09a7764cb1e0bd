use std::fmt;

use crate::config::{parse_regex_flag, Alphabet, Config};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const USAGE: &str = r#"usage: tmux-fastcopy [options]

Renders a vimium/vimperator-style overlay on top of the text in a tmux window
to allow copying important text on the screen.

The following flags are available:

    -pane PANE
        target pane for the overlay.
        This may be a pane index in the current window, or a unique
        pane identifier. Uses the current pane if unspecified.
    -action COMMAND
    -shift-action COMMAND
        command and arguments that handle the selection.
        'action' is the default selection action, 'shift-action' runs
        when the Shift key is held. The first '{}' in the argument list
        is replaced with the selected text; without a '{}', the text is
        sent over stdin.
            -action 'tmux load-buffer -'  # default
            -action pbcopy -shift-action open
    -regex NAME:PATTERN
        regular expressions to search for. Repeatable; reuse a name to
        replace a pattern, or leave PATTERN empty to unset it.
            -regex 'phab-diff:\bD\d{3,}\b'
            -regex 'ipv4:'
        A capture group in the regex selects the text to copy,
        defaulting to the whole match. Defaults: ipv4, gitsha, hexaddr,
        hexcolor, int, path, uuid, isodate.
    -alphabet STRING
        characters used to generate labels (at least two, no
        duplicates).
            -alphabet "asdfghjkl;"  # qwerty home row
    -tmux PATH
        path to the tmux executable (default "tmux").
    -log FILE
        file to write logs to (default stderr).
    -verbose
        log more output.
    -version
        display version information.
"#;

pub fn usage() -> &'static str {
    USAGE
}

#[derive(Debug)]
pub enum Parsed {
    Run(Config),
    Version,
    Help,
}

/// A flag-parsing failure. `usage` failures are structural (unknown flag,
/// missing value, stray positional argument) and exit with code 2; the rest
/// are invalid option values and exit with code 1.
#[derive(Debug)]
pub struct ParseError {
    pub message: String,
    pub usage: bool,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ParseError {}

fn usage_err(message: impl Into<String>) -> ParseError {
    ParseError { message: message.into(), usage: true }
}

fn value_err(message: impl fmt::Display) -> ParseError {
    ParseError { message: message.to_string(), usage: false }
}

/// Parses command-line arguments (without the program name) into a Config.
/// Flags may be spelled `-flag value`, `--flag value`, or `-flag=value`.
pub fn parse_args(args: &[String]) -> Result<Parsed, ParseError> {
    let mut cfg = Config { tmux: "tmux".to_string(), ..Config::default() };

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        let stripped = arg
            .strip_prefix("--")
            .or_else(|| arg.strip_prefix('-'))
            .ok_or_else(|| usage_err(format!("unexpected arguments {:?}", &args[i..])))?;

        let (name, mut value) = match stripped.split_once('=') {
            Some((n, v)) => (n, Some(v.to_string())),
            None => (stripped, None),
        };

        let mut take_value = |value: &mut Option<String>| -> Result<String, ParseError> {
            if let Some(v) = value.take() {
                return Ok(v);
            }
            i += 1;
            args.get(i)
                .cloned()
                .ok_or_else(|| usage_err(format!("flag -{} needs a value", name)))
        };

        match name {
            "pane" => cfg.pane = take_value(&mut value)?,
            "action" => cfg.action = take_value(&mut value)?,
            "shift-action" => cfg.shift_action = take_value(&mut value)?,
            "alphabet" => {
                let v = take_value(&mut value)?;
                cfg.alphabet = Alphabet::parse(&v).map_err(value_err)?;
            }
            "regex" => {
                let v = take_value(&mut value)?;
                let (rname, pattern) = parse_regex_flag(&v).map_err(value_err)?;
                cfg.regexes.insert(rname, pattern);
            }
            "tmux" => cfg.tmux = take_value(&mut value)?,
            "log" => cfg.log_file = take_value(&mut value)?,
            "verbose" => cfg.verbose = true,
            "version" => return Ok(Parsed::Version),
            "h" | "help" => return Ok(Parsed::Help),
            _ => return Err(usage_err(format!("unknown flag -{}", name))),
        }
        if value.is_some() {
            return Err(usage_err(format!("flag -{} does not take a value", name)));
        }
        i += 1;
    }

    Ok(Parsed::Run(cfg))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Parsed, ParseError> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        parse_args(&args)
    }

    #[test]
    fn empty_args_run_with_defaults() {
        match parse(&[]).unwrap() {
            Parsed::Run(cfg) => {
                assert_eq!(cfg.tmux, "tmux");
                assert!(cfg.pane.is_empty());
                assert!(cfg.regexes.is_empty());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn version_flag() {
        assert!(matches!(parse(&["-version"]).unwrap(), Parsed::Version));
    }

    #[test]
    fn unknown_flag_is_usage_error() {
        let err = parse(&["-wat"]).unwrap_err();
        assert!(err.usage);
        assert!(err.message.contains("wat"));
    }

    #[test]
    fn positional_arguments_rejected() {
        let err = parse(&["stray"]).unwrap_err();
        assert!(err.usage);
    }

    #[test]
    fn missing_value_rejected() {
        let err = parse(&["-pane"]).unwrap_err();
        assert!(err.usage);
    }

    #[test]
    fn short_alphabet_is_config_error() {
        let err = parse(&["-alphabet", "a"]).unwrap_err();
        assert!(!err.usage);
        assert_eq!(err.message, "alphabet must have at least two items");
    }

    #[test]
    fn repeated_regex_flags_accumulate() {
        match parse(&["-regex", "a:x+", "-regex", "b:y+", "-regex", "a:z+"]).unwrap() {
            Parsed::Run(cfg) => {
                assert_eq!(cfg.regexes.get("a").map(String::as_str), Some("z+"));
                assert_eq!(cfg.regexes.get("b").map(String::as_str), Some("y+"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn equals_form_accepted() {
        match parse(&["-pane=%7", "--verbose"]).unwrap() {
            Parsed::Run(cfg) => {
                assert_eq!(cfg.pane, "%7");
                assert!(cfg.verbose);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
