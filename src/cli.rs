use chrono::{DateTime, FixedOffset};

use reminder_bridge::calendar::{Rgba, ReminderCreate};

pub const USAGE: &str = "\
Usage: reminder-bridge [--api-key KEY] <command>

Commands:
  status                              Show the reminders permission
  request-access                      Ask the host for reminders access
  lists                               List reminder lists
  list <id>                           Show one reminder list
  create-list <title> --source <id> [--color r,g,b[,a]]
  rename-list <id> <title>
  reminders <list-id>...              Reminders in the given lists
  reminder <id>                       Show one reminder
  create-reminder <list-id> <title> [--due RFC3339] [--priority N]
                  [--notes TEXT] [--url URL]
  complete <id>                       Mark a reminder completed";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Status,
    RequestAccess,
    Lists,
    List { id: String },
    CreateList { title: String, source_id: String, color: Option<Rgba> },
    RenameList { id: String, title: String },
    Reminders { list_ids: Vec<String> },
    Reminder { id: String },
    CreateReminder { list_id: String, create: ReminderCreate },
    Complete { id: String },
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub api_key: Option<String>,
    pub command: Command,
}

pub fn parse_args<I>(args: I) -> Result<Invocation, String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter().peekable();
    let mut api_key = None;

    while let Some(arg) = args.next_if(|a| a.starts_with("--")) {
        match arg.as_str() {
            "--api-key" => api_key = Some(value_of(&mut args, "--api-key")?),
            "--help" => {
                return Ok(Invocation {
                    api_key,
                    command: Command::Help,
                })
            }
            _ => return Err(format!("Unknown argument: {arg}")),
        }
    }

    let name = args.next().ok_or("Missing command")?;
    let rest: Vec<String> = args.collect();
    let command = parse_command(&name, rest)?;
    Ok(Invocation { api_key, command })
}

fn parse_command(name: &str, args: Vec<String>) -> Result<Command, String> {
    let (positional, options) = split_options(args)?;
    let arity = |n: usize| {
        if positional.len() == n {
            Ok(())
        } else {
            Err(format!("'{name}' expects {n} argument(s), got {}", positional.len()))
        }
    };

    let command = match name {
        "status" => {
            arity(0)?;
            Command::Status
        }
        "request-access" => {
            arity(0)?;
            Command::RequestAccess
        }
        "lists" => {
            arity(0)?;
            Command::Lists
        }
        "list" => {
            arity(1)?;
            Command::List {
                id: positional[0].clone(),
            }
        }
        "create-list" => {
            arity(1)?;
            let source_id = option(&options, "--source").ok_or("'create-list' requires --source")?;
            let color = option(&options, "--color")
                .map(|c| Rgba::parse(&c).map_err(|e| e.to_string()))
                .transpose()?;
            Command::CreateList {
                title: positional[0].clone(),
                source_id,
                color,
            }
        }
        "rename-list" => {
            arity(2)?;
            Command::RenameList {
                id: positional[0].clone(),
                title: positional[1].clone(),
            }
        }
        "reminders" => {
            if positional.is_empty() {
                return Err("'reminders' expects at least one list id".to_string());
            }
            Command::Reminders {
                list_ids: positional,
            }
        }
        "reminder" => {
            arity(1)?;
            Command::Reminder {
                id: positional[0].clone(),
            }
        }
        "create-reminder" => {
            arity(2)?;
            let mut create = ReminderCreate::new(positional[1].clone());
            if let Some(due) = option(&options, "--due") {
                let due = DateTime::<FixedOffset>::parse_from_rfc3339(&due)
                    .map_err(|e| format!("Invalid --due '{due}': {e}"))?;
                create.due_date = Some(due.into());
            }
            if let Some(priority) = option(&options, "--priority") {
                create.priority = priority
                    .parse()
                    .map_err(|_| format!("Invalid --priority '{priority}'"))?;
            }
            create.notes = option(&options, "--notes");
            create.url = option(&options, "--url");
            Command::CreateReminder {
                list_id: positional[0].clone(),
                create,
            }
        }
        "complete" => {
            arity(1)?;
            Command::Complete {
                id: positional[0].clone(),
            }
        }
        "help" => Command::Help,
        other => return Err(format!("Unknown command: {other}")),
    };
    Ok(command)
}

type Options = Vec<(String, String)>;

fn split_options(args: Vec<String>) -> Result<(Vec<String>, Options), String> {
    let mut positional = Vec::new();
    let mut options = Vec::new();
    let mut args = args.into_iter().peekable();

    while let Some(arg) = args.next() {
        if arg.starts_with("--") {
            let value = value_of(&mut args, &arg)?;
            options.push((arg, value));
        } else {
            positional.push(arg);
        }
    }
    Ok((positional, options))
}

fn value_of<I>(args: &mut std::iter::Peekable<I>, flag: &str) -> Result<String, String>
where
    I: Iterator<Item = String>,
{
    args.next().ok_or_else(|| format!("{flag} requires a value"))
}

fn option(options: &Options, flag: &str) -> Option<String> {
    options
        .iter()
        .rev()
        .find(|(name, _)| name == flag)
        .map(|(_, value)| value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(line: &str) -> Result<Invocation, String> {
        parse_args(line.split_whitespace().map(str::to_string))
    }

    #[test]
    fn parses_plain_command() {
        let invocation = parse("lists").unwrap();
        assert_eq!(invocation.command, Command::Lists);
        assert_eq!(invocation.api_key, None);
    }

    #[test]
    fn parses_api_key_before_command() {
        let invocation = parse("--api-key abc reminder r-1").unwrap();
        assert_eq!(invocation.api_key.as_deref(), Some("abc"));
        assert_eq!(invocation.command, Command::Reminder { id: "r-1".into() });
    }

    #[test]
    fn parses_create_list_with_color() {
        let invocation = parse("create-list Groceries --source src-1 --color 1,0,0").unwrap();
        assert_eq!(
            invocation.command,
            Command::CreateList {
                title: "Groceries".into(),
                source_id: "src-1".into(),
                color: Some(Rgba::new(1.0, 0.0, 0.0, 1.0).unwrap()),
            }
        );
    }

    #[test]
    fn create_list_rejects_out_of_range_color() {
        assert!(parse("create-list Groceries --source src-1 --color 2,0,0").is_err());
    }

    #[test]
    fn parses_create_reminder_options() {
        let invocation =
            parse("create-reminder list-1 Dentist --due 2024-05-01T09:00:00+02:00 --priority 1")
                .unwrap();
        let Command::CreateReminder { list_id, create } = invocation.command else {
            panic!("expected create-reminder");
        };
        assert_eq!(list_id, "list-1");
        assert_eq!(create.title, "Dentist");
        assert_eq!(create.priority, 1);
        assert!(create.due_date.is_some());
    }

    #[test]
    fn reminders_takes_many_ids() {
        let invocation = parse("reminders a b c").unwrap();
        assert_eq!(
            invocation.command,
            Command::Reminders {
                list_ids: vec!["a".into(), "b".into(), "c".into()]
            }
        );
        assert!(parse("reminders").is_err());
    }

    #[test]
    fn rejects_unknown_and_missing() {
        assert!(parse("").is_err());
        assert!(parse("frobnicate").is_err());
        assert!(parse("list").is_err());
        assert!(parse("create-list Groceries").is_err());
    }
}
