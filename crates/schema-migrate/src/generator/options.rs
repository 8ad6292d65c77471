//! Export options passed to every generator.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Which schema objects are emitted alongside tables and columns.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ExportFlags: u8 {
        const PRIMARY_KEYS = 0b0_0001;
        const FOREIGN_KEYS = 0b0_0010;
        const INDEXES = 0b0_0100;
        const DEFAULTS = 0b0_1000;
        const IDENTITIES = 0b1_0000;
    }
}

impl Default for ExportFlags {
    fn default() -> Self {
        ExportFlags::all()
    }
}

/// Target-specific settings that used to be process-wide defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectOptions {
    #[default]
    None,
    Mysql {
        engine: Option<String>,
        charset: Option<String>,
        collation: Option<String>,
    },
    Postgres {
        owner: Option<String>,
        encoding: Option<String>,
    },
    Mssql {
        collation: Option<String>,
    },
}

/// Everything the generator needs to know besides the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub flags: ExportFlags,
    /// Emit DDL.
    pub export_schema: bool,
    /// Emit `INSERT` statements for table rows.
    pub export_data: bool,
    /// Emit the create-database directive first.
    pub create_database: bool,
    /// Database name for the directive (defaults to the model's name).
    pub database_name: Option<String>,
    pub dialect_options: DialectOptions,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            flags: ExportFlags::default(),
            export_schema: true,
            export_data: false,
            create_database: false,
            database_name: None,
            dialect_options: DialectOptions::None,
        }
    }
}

impl ExportOptions {
    /// Whether `flag` is enabled.
    pub fn has(&self, flag: ExportFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Return a copy with `flag` switched off.
    pub fn without(mut self, flag: ExportFlags) -> Self {
        self.flags.remove(flag);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = ExportOptions::default();
        assert!(opts.export_schema);
        assert!(!opts.export_data);
        assert!(opts.has(ExportFlags::IDENTITIES));
        assert!(opts.has(ExportFlags::FOREIGN_KEYS));
    }

    #[test]
    fn test_without_flag() {
        let opts = ExportOptions::default().without(ExportFlags::INDEXES);
        assert!(!opts.has(ExportFlags::INDEXES));
        assert!(opts.has(ExportFlags::DEFAULTS));
    }
}
