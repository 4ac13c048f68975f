pub mod client_command;
pub mod codec;
pub mod error;
pub mod server_response;

use client_command::{Command, Verb};
use error::ParseError;

pub const FIELD_DELIMITER: char = ',';
pub const DONE_MARKER: &str = "DONE";
pub const CLOSING_NOTICE: &str = "closing connection...";

pub fn is_quit(line: &str) -> bool {
    let line = line.trim();
    line.eq_ignore_ascii_case("q") || line.eq_ignore_ascii_case("quit")
}

/// Decodes `verb[,target[=value]]*`. Every target is decoded before anything
/// is returned, so a malformed argument rejects the whole command.
pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut fields = line.split(FIELD_DELIMITER).map(str::trim);
    let word = fields.next().unwrap_or_default();
    let verb = Verb::parse(word).ok_or_else(|| ParseError::UnknownCommand(word.to_string()))?;
    let args: Vec<&str> = fields.filter(|f| !f.is_empty()).collect();

    if verb == Verb::Quit {
        return Ok(Command::Quit);
    }

    if verb.takes_values() {
        let targets = args
            .iter()
            .map(|arg| parse_target(arg))
            .collect::<Result<Vec<_>, _>>()?;
        if targets.is_empty() {
            return Err(ParseError::NoTargets(verb));
        }
        return Ok(match verb {
            Verb::Goto => Command::Goto { targets },
            Verb::Offset => Command::Offset { targets },
            _ => Command::Speed { targets },
        });
    }

    let axes = args
        .iter()
        .map(|arg| parse_slot(arg))
        .collect::<Result<Vec<_>, _>>()?;
    if axes.is_empty() && !verb.defaults_to_all_axes() {
        return Err(ParseError::NoTargets(verb));
    }
    Ok(match verb {
        Verb::Status => Command::Status { axes },
        Verb::State => Command::State { axes },
        Verb::Stop => Command::Stop { axes },
        Verb::Home => Command::Home { axes },
        _ => Command::Zero { axes },
    })
}

fn parse_slot(arg: &str) -> Result<char, ParseError> {
    if arg.contains('=') {
        return Err(ParseError::UnexpectedValue(arg.to_string()));
    }
    let mut chars = arg.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Ok(c.to_ascii_lowercase()),
        _ => Err(ParseError::InvalidSlot(arg.to_string())),
    }
}

fn parse_target(arg: &str) -> Result<(char, f64), ParseError> {
    let (slot, value) = arg
        .split_once('=')
        .ok_or_else(|| ParseError::MissingValue(arg.to_string()))?;
    let slot = parse_slot(slot.trim())?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|source| ParseError::InvalidNumber {
            arg: arg.to_string(),
            source,
        })?;
    if !value.is_finite() {
        return Err(ParseError::NonFinite(arg.to_string()));
    }
    Ok((slot, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use server_response::Reply;

    #[test]
    fn test_parse_goto_command() {
        let cmd = parse_command("goto,a=10,b=-2.5\r\n").unwrap();
        assert_eq!(
            cmd,
            Command::Goto {
                targets: vec![('a', 10.0), ('b', -2.5)]
            }
        );
        assert_eq!(cmd.slots(), vec!['a', 'b']);
    }

    #[test]
    fn test_parse_bare_targets() {
        assert_eq!(
            parse_command("home").unwrap(),
            Command::Home { axes: Vec::new() }
        );
        assert_eq!(
            parse_command("STOP, a ,c").unwrap(),
            Command::Stop {
                axes: vec!['a', 'c']
            }
        );
        assert_eq!(
            parse_command("status,t").unwrap(),
            Command::Status { axes: vec!['t'] }
        );
    }

    #[test]
    fn test_empty_and_unknown() {
        assert_eq!(parse_command("  \r\n"), Err(ParseError::Empty));
        let err = parse_command("fly,a=1").unwrap_err();
        assert_eq!(err, ParseError::UnknownCommand("fly".to_string()));
        assert_eq!(
            Reply::command_failure(err).render(),
            "BAD,command failure: unknown command fly"
        );
        assert_eq!(
            Reply::command_failure(ParseError::Empty).render(),
            "BAD,command failure: empty command"
        );
    }

    #[test]
    fn test_malformed_number_rejects_whole_command() {
        let err = parse_command("goto,a=1,b=abc,c=3").unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { ref arg, .. } if arg == "b=abc"));
        assert!(err.to_string().starts_with("expected args float or int"));

        assert!(matches!(
            parse_command("offset,a=nan"),
            Err(ParseError::NonFinite(_))
        ));
    }

    #[test]
    fn test_target_shape_errors() {
        assert_eq!(
            parse_command("goto,a"),
            Err(ParseError::MissingValue("a".to_string()))
        );
        assert_eq!(
            parse_command("home,a=3"),
            Err(ParseError::UnexpectedValue("a=3".to_string()))
        );
        assert_eq!(
            parse_command("zero,ab"),
            Err(ParseError::InvalidSlot("ab".to_string()))
        );
        assert_eq!(parse_command("goto"), Err(ParseError::NoTargets(Verb::Goto)));
        assert_eq!(parse_command("zero"), Err(ParseError::NoTargets(Verb::Zero)));
    }

    #[test]
    fn test_quit_detection() {
        assert!(is_quit("q"));
        assert!(is_quit("QUIT\r"));
        assert!(!is_quit("quitter"));
        assert_eq!(parse_command("quit").unwrap(), Command::Quit);
    }

    #[test]
    fn test_reply_rendering() {
        let mut reply = Reply::ok();
        reply.push_detail('a', "OK");
        assert_eq!(reply.render(), "OK\na=OK");

        reply.push_failure('b', "axis is BUSY");
        assert!(!reply.is_ok());
        assert_eq!(reply.render(), "BAD\na=OK\nBAD,b: axis is BUSY");

        assert_eq!(reply.force_ok().render(), "OK\na=OK\nBAD,b: axis is BUSY");
        assert_eq!(Reply::ok_with("IDLE").render(), "OK,IDLE");
    }
}
