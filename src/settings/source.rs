use toml::{Table, Value};

use super::SettingsError;

/// A value contributed by a settings source, placed at a dotted path.
#[derive(Debug, Clone)]
pub struct SettingsEntry {
    pub path: Vec<String>,
    pub value: Value,
}

impl SettingsEntry {
    /// A whole table merged at the root.
    pub fn root(table: Table) -> Self {
        Self {
            path: Vec::new(),
            value: Value::Table(table),
        }
    }

    pub fn at_path(path: Vec<String>, value: Value) -> Self {
        Self { path, value }
    }
}

/// A layer of factory settings.
pub trait SettingsSource: std::fmt::Debug {
    fn entries(&self) -> Result<Vec<SettingsEntry>, SettingsError>;
}

/// Merges `entry` into `table`, creating intermediate tables as needed.
pub fn apply_entry(table: &mut Table, entry: SettingsEntry) {
    let SettingsEntry { path, value } = entry;
    let Some((leaf, parents)) = path.split_last() else {
        if let Value::Table(overlay) = value {
            merge_tables(table, overlay);
        }
        return;
    };

    let mut target = table;
    for segment in parents {
        let slot = target
            .entry(segment.clone())
            .or_insert(Value::Table(Table::new()));
        if !slot.is_table() {
            *slot = Value::Table(Table::new());
        }
        let Value::Table(nested) = slot else {
            return;
        };
        target = nested;
    }

    match (target.get_mut(leaf), value) {
        (Some(Value::Table(base)), Value::Table(overlay)) => merge_tables(base, overlay),
        (_, value) => {
            target.insert(leaf.clone(), value);
        }
    }
}

/// Recursively merges `overlay` into `base`; non-table values are replaced.
fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(base_table)), Value::Table(overlay_table)) => {
                merge_tables(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(toml_str: &str) -> Table {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn test_root_entry_merges_recursively() {
        let mut base = table("[context]\npath = \"a.xml\"\nforce_reload = true\n");
        apply_entry(&mut base, SettingsEntry::root(table("[context]\npath = \"b.xml\"\n")));

        assert_eq!(base["context"]["path"].as_str(), Some("b.xml"));
        assert_eq!(base["context"]["force_reload"].as_bool(), Some(true));
    }

    #[test]
    fn test_path_entry_creates_tables() {
        let mut base = Table::new();
        apply_entry(
            &mut base,
            SettingsEntry::at_path(
                vec!["evaluator".into(), "enabled".into()],
                Value::Boolean(false),
            ),
        );

        assert_eq!(base["evaluator"]["enabled"].as_bool(), Some(false));
    }

    #[test]
    fn test_path_entry_replaces_scalar_parent() {
        let mut base = table("evaluator = 1\n");
        apply_entry(
            &mut base,
            SettingsEntry::at_path(
                vec!["evaluator".into(), "max_depth".into()],
                Value::Integer(8),
            ),
        );

        assert_eq!(base["evaluator"]["max_depth"].as_integer(), Some(8));
    }
}
