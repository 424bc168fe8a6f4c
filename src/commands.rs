//! Slash command parsing and role gating.
//!
//! Arguments are split shell-style, so quoted names work. Item names may
//! also be typed bare: numeric arguments are taken from the end of the line
//! and the remaining words form the name (`/add Es Teh 2`).

use crate::accounts::Role;
use crate::error::{PosError, PosResult};

/// Which roles may run a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Any,
    Cashier,
    Manager,
}

impl Access {
    pub fn permits(&self, role: Role) -> bool {
        match self {
            Self::Any => true,
            Self::Cashier => role == Role::Cashier,
            Self::Manager => role == Role::Manager,
        }
    }
}

/// Help table entry
pub struct CommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub about: &'static str,
    pub access: Access,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "/best",
        usage: "/best",
        about: "show the best-selling item",
        access: Access::Any,
    },
    CommandSpec {
        name: "/stock",
        usage: "/stock",
        about: "list stock per item",
        access: Access::Cashier,
    },
    CommandSpec {
        name: "/price",
        usage: "/price <name>",
        about: "show an item's price",
        access: Access::Cashier,
    },
    CommandSpec {
        name: "/order",
        usage: "/order",
        about: "start a new order and go through the menu",
        access: Access::Cashier,
    },
    CommandSpec {
        name: "/new",
        usage: "/new",
        about: "start a new empty order",
        access: Access::Cashier,
    },
    CommandSpec {
        name: "/add",
        usage: "/add <name> <qty>",
        about: "add a line to the current order",
        access: Access::Cashier,
    },
    CommandSpec {
        name: "/total",
        usage: "/total",
        about: "show the current order total",
        access: Access::Cashier,
    },
    CommandSpec {
        name: "/restock",
        usage: "/restock <name> <amount>",
        about: "add stock to an item",
        access: Access::Manager,
    },
    CommandSpec {
        name: "/menu-add",
        usage: "/menu-add <name> <price> <stock>",
        about: "add a menu item",
        access: Access::Manager,
    },
    CommandSpec {
        name: "/menu-rm",
        usage: "/menu-rm <name>",
        about: "remove a menu item",
        access: Access::Manager,
    },
    CommandSpec {
        name: "/sales",
        usage: "/sales",
        about: "show sales per item",
        access: Access::Manager,
    },
    CommandSpec {
        name: "/today",
        usage: "/today",
        about: "show today's sales summary",
        access: Access::Manager,
    },
    CommandSpec {
        name: "/users",
        usage: "/users",
        about: "list accounts",
        access: Access::Manager,
    },
    CommandSpec {
        name: "/passwd",
        usage: "/passwd <new password>",
        about: "change your password",
        access: Access::Any,
    },
    CommandSpec {
        name: "/save",
        usage: "/save",
        about: "save the snapshot now",
        access: Access::Any,
    },
    CommandSpec {
        name: "/whoami",
        usage: "/whoami",
        about: "show session info",
        access: Access::Any,
    },
    CommandSpec {
        name: "/help",
        usage: "/help",
        about: "show commands",
        access: Access::Any,
    },
    CommandSpec {
        name: "/exit",
        usage: "/exit",
        about: "save and quit",
        access: Access::Any,
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Best,
    Stock,
    Price(String),
    Order,
    NewOrder,
    Add { item: String, quantity: i64 },
    Total,
    Restock { item: String, amount: i64 },
    MenuAdd { name: String, price: i64, stock: i64 },
    MenuRemove(String),
    Sales,
    Today,
    Users,
    Passwd(String),
    Save,
    WhoAmI,
    Help,
    Exit,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Best => "/best",
            Self::Stock => "/stock",
            Self::Price(_) => "/price",
            Self::Order => "/order",
            Self::NewOrder => "/new",
            Self::Add { .. } => "/add",
            Self::Total => "/total",
            Self::Restock { .. } => "/restock",
            Self::MenuAdd { .. } => "/menu-add",
            Self::MenuRemove(_) => "/menu-rm",
            Self::Sales => "/sales",
            Self::Today => "/today",
            Self::Users => "/users",
            Self::Passwd(_) => "/passwd",
            Self::Save => "/save",
            Self::WhoAmI => "/whoami",
            Self::Help => "/help",
            Self::Exit => "/exit",
        }
    }

    pub fn access(&self) -> Access {
        spec(self.name()).map(|s| s.access).unwrap_or(Access::Any)
    }

    pub fn allowed_for(&self, role: Role) -> bool {
        self.access().permits(role)
    }

    /// Whether the command can change catalog or account state
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            Self::Order
                | Self::Add { .. }
                | Self::Restock { .. }
                | Self::MenuAdd { .. }
                | Self::MenuRemove(_)
                | Self::Passwd(_)
        )
    }
}

fn spec(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|s| s.name == name)
}

/// Commands visible to a role, in help order
pub fn available(role: Role) -> impl Iterator<Item = &'static CommandSpec> {
    COMMANDS.iter().filter(move |s| s.access.permits(role))
}

/// Parse one input line into a command
pub fn parse(line: &str) -> PosResult<Command> {
    let words = shell_words::split(line.trim())
        .map_err(|_| PosError::Usage("unbalanced quotes".to_string()))?;
    let Some((head, args)) = words.split_first() else {
        return Err(PosError::Usage("/help".to_string()));
    };

    let usage = || {
        PosError::Usage(
            spec(head)
                .map(|s| s.usage.to_string())
                .unwrap_or_else(|| "/help".to_string()),
        )
    };

    let cmd = match head.as_str() {
        "/best" => Command::Best,
        "/stock" => Command::Stock,
        "/price" => Command::Price(name_arg(args).ok_or_else(usage)?),
        "/order" => Command::Order,
        "/new" => Command::NewOrder,
        "/add" => {
            let (item, [quantity]) = name_and_numbers::<1>(args).ok_or_else(usage)?;
            Command::Add { item, quantity }
        }
        "/total" => Command::Total,
        "/restock" => {
            let (item, [amount]) = name_and_numbers::<1>(args).ok_or_else(usage)?;
            Command::Restock { item, amount }
        }
        "/menu-add" => {
            let (name, [price, stock]) = name_and_numbers::<2>(args).ok_or_else(usage)?;
            Command::MenuAdd { name, price, stock }
        }
        "/menu-rm" => Command::MenuRemove(name_arg(args).ok_or_else(usage)?),
        "/sales" => Command::Sales,
        "/today" => Command::Today,
        "/users" => Command::Users,
        "/passwd" => match args {
            [password] => Command::Passwd(password.clone()),
            _ => return Err(usage()),
        },
        "/save" => Command::Save,
        "/whoami" => Command::WhoAmI,
        "/help" => Command::Help,
        "/exit" | "/quit" => Command::Exit,
        other => {
            return Err(PosError::Usage(format!(
                "unknown command {}, try /help",
                other
            )));
        }
    };
    Ok(cmd)
}

fn name_arg(args: &[String]) -> Option<String> {
    let name = args.join(" ");
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Split `args` into a leading name and `N` trailing integers
fn name_and_numbers<const N: usize>(args: &[String]) -> Option<(String, [i64; N])> {
    if args.len() <= N {
        return None;
    }
    let (name_words, number_words) = args.split_at(args.len() - N);
    let mut numbers = [0i64; N];
    for (slot, word) in numbers.iter_mut().zip(number_words) {
        *slot = word.parse().ok()?;
    }
    Some((name_arg(name_words)?, numbers))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        assert_eq!(parse("/best").unwrap(), Command::Best);
        assert_eq!(parse("  /stock  ").unwrap(), Command::Stock);
        assert_eq!(parse("/quit").unwrap(), Command::Exit);
    }

    #[test]
    fn test_parse_names_with_spaces() {
        assert_eq!(
            parse("/price Es Teh").unwrap(),
            Command::Price("Es Teh".to_string())
        );
        assert_eq!(
            parse("/add \"Es Teh\" 2").unwrap(),
            Command::Add {
                item: "Es Teh".to_string(),
                quantity: 2
            }
        );
        assert_eq!(
            parse("/add Es Teh 2").unwrap(),
            Command::Add {
                item: "Es Teh".to_string(),
                quantity: 2
            }
        );
        assert_eq!(
            parse("/menu-add Kopi Susu 15 20").unwrap(),
            Command::MenuAdd {
                name: "Kopi Susu".to_string(),
                price: 15,
                stock: 20
            }
        );
    }

    #[test]
    fn test_parse_negative_amount_is_kept() {
        assert_eq!(
            parse("/restock Latte -1").unwrap(),
            Command::Restock {
                item: "Latte".to_string(),
                amount: -1
            }
        );
    }

    #[test]
    fn test_parse_usage_errors() {
        let err = parse("/add Latte").unwrap_err();
        assert!(matches!(&err, PosError::Usage(u) if u == "/add <name> <qty>"));
        assert!(matches!(parse("/add Latte two"), Err(PosError::Usage(_))));
        assert!(matches!(parse("/price"), Err(PosError::Usage(_))));
        assert!(matches!(parse("/menu-add 1 2"), Err(PosError::Usage(_))));
        assert!(matches!(parse("/add \"Latte 2"), Err(PosError::Usage(_))));
        assert!(matches!(parse("/dance"), Err(PosError::Usage(u)) if u.contains("unknown")));
        assert!(matches!(parse("/passwd a b"), Err(PosError::Usage(_))));
    }

    #[test]
    fn test_role_gating() {
        assert!(Command::Stock.allowed_for(Role::Cashier));
        assert!(!Command::Stock.allowed_for(Role::Manager));
        assert!(Command::Sales.allowed_for(Role::Manager));
        assert!(!Command::Sales.allowed_for(Role::Cashier));
        assert!(Command::Best.allowed_for(Role::Cashier));
        assert!(Command::Best.allowed_for(Role::Manager));
        assert!(Command::Exit.allowed_for(Role::Cashier));
    }

    #[test]
    fn test_every_command_is_listed() {
        for line in [
            "/best", "/stock", "/price x", "/order", "/new", "/add x 1", "/total",
            "/restock x 1", "/menu-add x 1 1", "/menu-rm x", "/sales", "/today",
            "/users", "/passwd x", "/save", "/whoami", "/help", "/exit",
        ] {
            let cmd = parse(line).unwrap();
            assert!(spec(cmd.name()).is_some(), "{}", cmd.name());
        }
    }

    #[test]
    fn test_available_per_role() {
        let cashier: Vec<_> = available(Role::Cashier).map(|s| s.name).collect();
        assert!(cashier.contains(&"/order"));
        assert!(!cashier.contains(&"/menu-add"));
        let manager: Vec<_> = available(Role::Manager).map(|s| s.name).collect();
        assert!(manager.contains(&"/today"));
        assert!(!manager.contains(&"/total"));
    }
}
