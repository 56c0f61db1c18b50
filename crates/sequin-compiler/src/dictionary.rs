//! External command dictionary
//!
//! Commands are not declared in source; they come from a dictionary mapping
//! a `(component, mnemonic)` pair to a numeric opcode and a typed argument
//! list. The dictionary is loaded from JSON and consulted during lowering to
//! validate calls and stamp the command opcode into the emitted instruction.

use crate::types::Type;
use rustc_hash::FxHashMap;
use serde::Deserialize;

/// One declared argument of a command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandArg {
    /// Argument name, for diagnostics
    pub name: String,
    /// Declared type
    pub ty: Type,
}

/// One dictionary entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandSpec {
    /// Owning component, e.g. `"EPS"`
    pub component: String,
    /// Command mnemonic, e.g. `"SET_MODE"`
    pub mnemonic: String,
    /// Numeric opcode stamped into emitted `Command` instructions
    pub opcode: u16,
    /// Ordered argument declarations
    #[serde(default)]
    pub args: Vec<CommandArg>,
}

impl CommandSpec {
    /// Qualified `COMPONENT.MNEMONIC` name.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.component, self.mnemonic)
    }
}

/// Lookup table of every command the target understands.
#[derive(Debug, Clone, Default)]
pub struct CommandDictionary {
    commands: FxHashMap<String, CommandSpec>,
}

impl CommandDictionary {
    /// Empty dictionary; every lookup misses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dictionary from parsed entries. Later duplicates of one
    /// qualified name replace earlier ones.
    pub fn from_specs(specs: Vec<CommandSpec>) -> Self {
        let mut commands = FxHashMap::default();
        for spec in specs {
            commands.insert(spec.qualified_name(), spec);
        }
        Self { commands }
    }

    /// Parse a dictionary from its JSON representation: an array of entries.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let specs: Vec<CommandSpec> = serde_json::from_str(json)?;
        Ok(Self::from_specs(specs))
    }

    /// Look up a command by component and mnemonic.
    pub fn get(&self, component: &str, mnemonic: &str) -> Option<&CommandSpec> {
        self.commands.get(&format!("{component}.{mnemonic}"))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True if the dictionary holds no entries.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let dict = CommandDictionary::from_specs(vec![CommandSpec {
            component: "EPS".to_string(),
            mnemonic: "SET_MODE".to_string(),
            opcode: 0x0102,
            args: vec![CommandArg {
                name: "mode".to_string(),
                ty: Type::U8,
            }],
        }]);
        let spec = dict.get("EPS", "SET_MODE").unwrap();
        assert_eq!(spec.opcode, 0x0102);
        assert_eq!(spec.args[0].ty, Type::U8);
        assert!(dict.get("EPS", "RESET").is_none());
        assert!(dict.get("ADCS", "SET_MODE").is_none());
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {
                "component": "COMMS",
                "mnemonic": "DOWNLINK",
                "opcode": 513,
                "args": [
                    { "name": "channel", "ty": "u8" },
                    { "name": "enable", "ty": "bool" }
                ]
            },
            { "component": "COMMS", "mnemonic": "RESET", "opcode": 514 }
        ]"#;
        let dict = CommandDictionary::from_json(json).unwrap();
        assert_eq!(dict.len(), 2);
        let spec = dict.get("COMMS", "DOWNLINK").unwrap();
        assert_eq!(spec.opcode, 0x0201);
        assert_eq!(spec.args[1].ty, Type::Bool);
        assert!(dict.get("COMMS", "RESET").unwrap().args.is_empty());
    }
}
