//! Command dispatch: turns parsed arguments into service calls and output

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use clap::CommandFactory;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::{Entry, ResultStore};
use crate::cli::args::{Cli, Commands, ConfigCommands, FilterArgs, SolverArgs};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{
    Assignment, Constraint, Node, NodeId, Pin, SwitchSide, Tree, TreeNodeConvert,
};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};
use crate::infrastructure::tree_file::load_tree;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Check { tree }) => cmd_check(tree),
        Some(Commands::Show { tree }) => cmd_show(tree),
        Some(Commands::Solve {
            tree,
            limit,
            solver,
            filter,
        }) => cmd_solve(tree, *limit, solver, filter),
        Some(Commands::Page {
            tree,
            budget,
            page,
            page_size,
            solver,
            filter,
        }) => cmd_page(tree, *budget, *page, *page_size, solver, filter),
        Some(Commands::Config { command }) => cmd_config(command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given, run 'tsolve --help'".to_string(),
        )),
    }
}

/// Settings for a tree file: layered config plus command-line overrides.
fn settings_for(tree_path: &Path, overrides: &SolverArgs) -> CliResult<Settings> {
    let mut settings = Settings::load(tree_path.parent())?;
    if let Some(rule) = overrides.rule {
        settings.solver.unlock_rule = rule;
    }
    if let Some(threads) = overrides.threads {
        settings.solver.threads = threads;
    }
    debug!("settings_for: {:?}", settings);
    Ok(settings)
}

fn load(container: &ServiceContainer, path: &Path) -> CliResult<Tree> {
    Ok(load_tree(container.fs.as_ref(), path)?)
}

/// Translate filter flags into a constraint.
///
/// A node may be named by one flag only; repeating the same pin is accepted.
pub fn build_constraint(filter: &FilterArgs) -> CliResult<Constraint> {
    let pins = filter
        .pins
        .iter()
        .map(|&(node, rank)| (node, Pin::Rank(rank)))
        .chain(filter.excludes.iter().map(|&node| (node, Pin::Excluded)))
        .chain(filter.sides.iter().map(|&(node, side)| (node, Pin::Side(side))));

    let mut constraint = Constraint::new();
    for (node, pin) in pins {
        match constraint.get(node) {
            Some(existing) if existing != pin => {
                return Err(CliError::InvalidArgs(format!(
                    "conflicting filters for node {node}: {existing:?} and {pin:?}"
                )))
            }
            _ => constraint.insert(node, pin),
        }
    }
    Ok(constraint)
}

fn solve(
    container: &ServiceContainer,
    tree: &Tree,
    limit: u32,
    filter: &FilterArgs,
) -> CliResult<ResultStore> {
    let mut store = container.solver.solve(tree, limit)?;
    if !filter.is_empty() {
        store.apply_filter(&build_constraint(filter)?)?;
    }
    if store.is_truncated() {
        output::warning(&format!(
            "enumeration stopped after {} configurations, counts are incomplete",
            container.settings.solver.max_configurations
        ));
    }
    Ok(store)
}

#[instrument]
fn cmd_check(path: &Path) -> CliResult<()> {
    let container = ServiceContainer::new(settings_for(path, &SolverArgs::default())?);
    let tree = load(&container, path)?;

    output::header(&format!("Tree '{}'", tree.name()));
    output::detail(&format!("nodes:              {}", tree.len()));
    output::detail(&format!("free nodes:         {}", tree.free_nodes().count()));
    output::detail(&format!("free points:        {}", tree.max_talent_points()));
    output::detail(&format!(
        "pre-filled points:  {}",
        tree.pre_filled_talent_points()
    ));

    match tree.is_solvable() {
        Ok(()) => {
            output::success("tree is solvable");
            Ok(())
        }
        Err(e) => {
            output::failure(&e);
            Err(CliError::from(InfraError::from(e)))
        }
    }
}

#[instrument]
fn cmd_show(path: &Path) -> CliResult<()> {
    let container = ServiceContainer::new(settings_for(path, &SolverArgs::default())?);
    let tree = load(&container, path)?;
    output::info(&tree.to_tree_string());
    Ok(())
}

#[instrument(skip(solver, filter))]
fn cmd_solve(
    path: &Path,
    limit: Option<u32>,
    solver: &SolverArgs,
    filter: &FilterArgs,
) -> CliResult<()> {
    let container = ServiceContainer::new(settings_for(path, solver)?);
    let tree = load(&container, path)?;
    let limit = limit.unwrap_or_else(|| tree.max_talent_points());
    let store = solve(&container, &tree, limit, filter)?;

    output::header(&format!(
        "{:>6}  {:>12}  {:>16}",
        "budget", "entries", "configurations"
    ));
    for budget in store.budgets() {
        output::info(&format!(
            "{:>6}  {:>12}  {:>16}",
            budget,
            store.filtered_len(budget)?,
            store.configuration_count(budget)?
        ));
    }
    output::action(
        "Total",
        &format!(
            "{} entries, {} configurations ({} before filtering)",
            store.filtered_entries(),
            store.filtered_configurations(),
            store.total_configurations()
        ),
    );
    output::action("Elapsed", &format!("{:?}", store.elapsed()));
    Ok(())
}

#[instrument(skip(solver, filter))]
fn cmd_page(
    path: &Path,
    budget: u32,
    page: usize,
    page_size: Option<usize>,
    solver: &SolverArgs,
    filter: &FilterArgs,
) -> CliResult<()> {
    if page_size == Some(0) {
        return Err(CliError::InvalidArgs("--page-size must be at least 1".to_string()));
    }
    let container = ServiceContainer::new(settings_for(path, solver)?);
    let tree = load(&container, path)?;
    let store = solve(&container, &tree, budget, filter)?;
    let page_size = page_size.unwrap_or(container.settings.output.page_size);

    let pages = store.page_count(budget, page_size)?;
    output::header(&format!(
        "Budget {}: page {} of {} ({} entries)",
        budget,
        page + 1,
        pages.max(1),
        store.filtered_len(budget)?
    ));
    let rows = store.decode_page(budget, page, page_size)?;
    if rows.is_empty() {
        output::detail("(no configurations)");
    }
    let pinned = store.pinned_sides();
    for (entry, assignment) in rows {
        output::info(&describe(&tree, &entry, &assignment, &pinned));
    }
    Ok(())
}

/// One line per configuration: index, multiplicity and the selected nodes.
///
/// Switch nodes print the pinned variant, or both variants when either is open.
fn describe(
    tree: &Tree,
    entry: &Entry,
    assignment: &Assignment,
    pinned: &BTreeMap<NodeId, SwitchSide>,
) -> String {
    let nodes = assignment
        .selected()
        .filter(|(id, _)| tree.node(*id).is_some_and(|n| n.is_free()))
        .map(|(id, rank)| match tree.node(id) {
            Some(node) => format!(
                "{} {}/{}",
                label(node, pinned.get(&id).copied()),
                rank,
                node.max_points
            ),
            None => format!("#{id} {rank}"),
        })
        .join(", ");
    let nodes = if nodes.is_empty() {
        "(empty)".to_string()
    } else {
        nodes
    };
    let index = entry.index.to_string();
    if entry.multiplicity > 1 {
        format!("{:<20} x{:<4} {}", index, entry.multiplicity, nodes)
    } else {
        format!("{:<20}       {}", index, nodes)
    }
}

fn label(node: &Node, side: Option<SwitchSide>) -> String {
    if !node.kind.is_switch() {
        return node.name.clone();
    }
    match side {
        Some(side) => format!("{} [{}]", node.name, node.variant_name(side)),
        None => format!(
            "{} [{}|{}]",
            node.name,
            node.variant_name(SwitchSide::First),
            node.variant_name(SwitchSide::Second)
        ),
    }
}

fn cmd_config(command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show { tree } => {
            let dir = tree.as_deref().and_then(Path::parent);
            let settings = Settings::load(dir)?;
            output::info(&settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine global config directory".to_string())
                })?
            } else {
                local_config_path(Path::new("."))
            };
            let fs = RealFileSystem;
            if fs.exists(&path) {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            fs.ensure_parent(&path)
                .map_err(|e| InfraError::io(format!("create parent of {}", path.display()), e))?;
            fs.write(&path, &Settings::template())
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::success(&format!("created {}", path.display()));
            Ok(())
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("Global", &path.display()),
                None => output::action("Global", &"(unavailable)"),
            }
            output::action("Local", &".tsolve.toml next to the tree file");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(
        pins: &[(NodeId, u8)],
        excludes: &[NodeId],
        sides: &[(NodeId, SwitchSide)],
    ) -> FilterArgs {
        FilterArgs {
            pins: pins.to_vec(),
            excludes: excludes.to_vec(),
            sides: sides.to_vec(),
        }
    }

    #[test]
    fn given_distinct_nodes_when_building_constraint_then_maps_every_flag() {
        let constraint =
            build_constraint(&filter(&[(1, 2)], &[3], &[(4, SwitchSide::First)])).unwrap();

        assert_eq!(constraint.get(1), Some(Pin::Rank(2)));
        assert_eq!(constraint.get(3), Some(Pin::Excluded));
        assert_eq!(constraint.get(4), Some(Pin::Side(SwitchSide::First)));
    }

    #[test]
    fn given_repeated_identical_pin_when_building_constraint_then_accepted() {
        let constraint = build_constraint(&filter(&[(1, 2), (1, 2)], &[], &[])).unwrap();
        assert_eq!(constraint.len(), 1);
    }

    #[test]
    fn given_conflicting_pins_on_one_node_when_building_constraint_then_rejected() {
        let cases = [
            filter(&[(1, 2)], &[1], &[]),
            filter(&[(1, 1), (1, 2)], &[], &[]),
            filter(&[], &[], &[(4, SwitchSide::First), (4, SwitchSide::Second)]),
        ];
        for args in &cases {
            assert!(matches!(
                build_constraint(args),
                Err(CliError::InvalidArgs(_))
            ));
        }
    }

    #[test]
    fn given_switch_node_when_labelling_then_names_variants() {
        let node = Node::new(4, "Stance").switch("Fire", "Frost");

        assert_eq!(label(&node, None), "Stance [Fire|Frost]");
        assert_eq!(label(&node, Some(SwitchSide::Second)), "Stance [Frost]");
        assert_eq!(label(&Node::new(1, "Strike"), None), "Strike");
    }
}
