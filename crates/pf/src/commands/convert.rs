//! Conversion commands: to-tree, from-tree and create.

use std::path::{Path, PathBuf};

use chrono::TimeZone;
use prep_filter_rs::{create_filter, Column, FilterDescriptor, FilterTreeAdapter, FilterType};
use serde_json::Value;
use tracing::debug;

use super::{read_input, CommandContext, Result, Zone};
use crate::output::{filters_output, format_filters_table, CreatedFilterOutput, FilterOutput};

/// Runs `$body` with `$adapter` bound to an adapter for the context's zone.
macro_rules! with_adapter {
    ($ctx:expr, |$adapter:ident| $body:expr) => {
        match $ctx.zone {
            Zone::Local => {
                let $adapter = FilterTreeAdapter::local();
                $body
            }
            Zone::Named(tz) => {
                let $adapter = FilterTreeAdapter::new(tz);
                $body
            }
        }
    };
}

/// Options for the from-tree command.
pub struct FromTreeOptions {
    /// Tree input file, stdin when absent.
    pub file: Option<PathBuf>,
    /// Column metadata file.
    pub columns: Option<PathBuf>,
}

/// Options for the create command.
pub struct CreateOptions {
    pub filter_type: FilterType,
    pub column: Option<String>,
    pub name: Option<String>,
    pub args: Option<String>,
    pub editable: bool,
}

/// Executes the to-tree command.
pub fn execute_to_tree(ctx: &CommandContext, file: Option<&Path>) -> Result<()> {
    let input = read_input(file)?;
    let filters: Vec<FilterDescriptor> = serde_json::from_str(&input)?;
    debug!(filters = filters.len(), zone = %ctx.zone, "read filter list");

    let tree = with_adapter!(ctx, |adapter| to_tree(&adapter, &filters))?;
    println!("{}", ctx.to_json(&tree)?);
    Ok(())
}

fn to_tree<Tz: TimeZone>(
    adapter: &FilterTreeAdapter<Tz>,
    filters: &[FilterDescriptor],
) -> Result<Value> {
    Ok(serde_json::to_value(adapter.to_tree(filters)?)?)
}

/// Executes the from-tree command.
pub fn execute_from_tree(ctx: &CommandContext, opts: &FromTreeOptions) -> Result<()> {
    let columns = load_columns(opts.columns.as_deref())?;
    let input = read_input(opts.file.as_deref())?;
    let tree: Value = serde_json::from_str(&input)?;

    let filters = with_adapter!(ctx, |adapter| from_tree(&adapter, &tree, &columns))?;

    match filters {
        None => println!("null"),
        Some(filters) if ctx.json_output => {
            println!("{}", ctx.to_json(&filters_output(&filters))?);
        }
        Some(filters) => {
            if !ctx.quiet {
                print!("{}", format_filters_table(&filters, ctx.use_colors));
            }
        }
    }
    Ok(())
}

/// Rebuilds filters from any accepted tree shape.
///
/// `null` gives `None`, `{}` gives an empty list, `{"filter": node}` and a
/// bare `node` give the node's filters.
fn from_tree<Tz: TimeZone>(
    adapter: &FilterTreeAdapter<Tz>,
    tree: &Value,
    columns: &[Column],
) -> Result<Option<Vec<FilterDescriptor>>> {
    let filters = match tree {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => Some(Vec::new()),
        Value::Object(map) if map.len() == 1 && map.contains_key("filter") => {
            adapter.from_json(map.get("filter"), columns)?
        }
        node => adapter.from_json(Some(node), columns)?,
    };
    Ok(filters)
}

fn load_columns(path: Option<&Path>) -> Result<Vec<Column>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let columns: Vec<Column> = serde_json::from_str(&read_input(Some(path))?)?;
    debug!(columns = columns.len(), path = %path.display(), "loaded column metadata");
    Ok(columns)
}

/// Executes the create command.
pub fn execute_create(ctx: &CommandContext, opts: &CreateOptions) -> Result<()> {
    let args = opts
        .args
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()?;

    let filter = create_filter(
        opts.filter_type,
        opts.column.as_deref(),
        opts.name.as_deref(),
        opts.editable,
        args.as_ref(),
        None,
        None,
    )?;
    let tree = with_adapter!(ctx, |adapter| adapter.filter_to_node(&filter))?;

    if ctx.json_output {
        let output = CreatedFilterOutput {
            filter: FilterOutput::from(&filter),
            tree: &tree,
        };
        println!("{}", ctx.to_json(&output)?);
    } else if !ctx.quiet {
        print!("{}", format_filters_table(std::slice::from_ref(&filter), ctx.use_colors));
        println!();
        println!("{}", serde_json::to_string_pretty(&tree)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandError;
    use chrono::Utc;
    use prep_filter_rs::FilterError;
    use serde_json::json;

    fn columns() -> Vec<Column> {
        vec![Column::new("0001", "lastname")]
    }

    #[test]
    fn test_from_tree_accepted_shapes() {
        let adapter = FilterTreeAdapter::new(Utc);
        let node = json!({"valid": {"field": "0001"}});

        assert_eq!(from_tree(&adapter, &Value::Null, &columns()).unwrap(), None);
        assert_eq!(
            from_tree(&adapter, &json!({}), &columns()).unwrap(),
            Some(Vec::new())
        );

        let bare = from_tree(&adapter, &node, &columns()).unwrap().unwrap();
        let wrapped = from_tree(&adapter, &json!({"filter": node}), &columns())
            .unwrap()
            .unwrap();
        assert_eq!(bare, wrapped);
        assert_eq!(bare[0].column_name(), Some("lastname"));
    }

    #[test]
    fn test_from_tree_unknown_operator() {
        let adapter = FilterTreeAdapter::new(Utc);
        let err = from_tree(&adapter, &json!({"xor": []}), &columns()).unwrap_err();

        assert!(matches!(
            err,
            CommandError::Filter(FilterError::UnrecognizedOperator { .. })
        ));
    }

    #[test]
    fn test_to_tree_of_empty_list() {
        let adapter = FilterTreeAdapter::new(Utc);
        assert_eq!(to_tree(&adapter, &[]).unwrap(), json!({}));
    }

    #[test]
    fn test_load_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("columns.json");
        std::fs::write(&path, r#"[{"id": "0001", "name": "lastname"}]"#).unwrap();

        assert_eq!(load_columns(Some(&path)).unwrap(), columns());
        assert!(load_columns(None).unwrap().is_empty());
    }
}
