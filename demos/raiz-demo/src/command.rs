//! Interactive commands read from stdin

use std::str::FromStr;

use raiz_diffusion::Channel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Spawn `n` TRONs
    Spawn(usize),
    /// Force apoptosis everywhere
    Kill,
    Reset,
    Start,
    Stop,
    Status,
    Json,
    /// Flip a gateway channel on or off
    Toggle(Channel),
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  spawn [n]        spawn n TRONs (default 1)
  kill             force apoptosis on every node
  reset            stop and wipe the system
  start | stop     start or stop nodes and auto-spawn
  toggle <channel> flip udp | websocket | ble | local
  status | json    print a snapshot
  help | quit";

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err("empty command".into());
        };
        let arg = words.next();

        let command = match (verb, arg) {
            ("spawn" | "s", None) => Command::Spawn(1),
            ("spawn" | "s", Some(n)) => {
                Command::Spawn(n.parse().map_err(|_| format!("not a count: {n}"))?)
            }
            ("kill" | "k", None) => Command::Kill,
            ("reset", None) => Command::Reset,
            ("start", None) => Command::Start,
            ("stop", None) => Command::Stop,
            ("status" | "st", None) => Command::Status,
            ("json", None) => Command::Json,
            ("toggle", Some(name)) => Command::Toggle(name.parse().map_err(|e| format!("{e}"))?),
            ("help" | "?", None) => Command::Help,
            ("quit" | "q" | "exit", None) => Command::Quit,
            _ => return Err(format!("unknown command: {}", line.trim())),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("spawn".parse::<Command>(), Ok(Command::Spawn(1)));
        assert_eq!("  spawn 5 ".parse::<Command>(), Ok(Command::Spawn(5)));
        assert_eq!("toggle ble".parse::<Command>(), Ok(Command::Toggle(Channel::Ble)));
        assert_eq!("q".parse::<Command>(), Ok(Command::Quit));
        assert!("toggle fax".parse::<Command>().is_err());
        assert!("spawn many".parse::<Command>().is_err());
        assert!("kill now".parse::<Command>().is_err());
        assert!("".parse::<Command>().is_err());
    }
}
