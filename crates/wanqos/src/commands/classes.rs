//! Class command handlers.

use tabled::Tabled;
use wanqos_core::{
    BackendStore, CreateClassRequest, Direction, EntityId, Registry, TrafficClass,
    UpdateClassRequest,
};

use crate::cli::{ClassesArgs, ClassesCommand, DirectionArg};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ClassRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Ext ID")]
    ext_id: u32,
    #[tabled(rename = "Direction")]
    direction: String,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Max")]
    max: String,
    #[tabled(rename = "Parent")]
    parent: String,
}

impl From<&TrafficClass> for ClassRow {
    fn from(c: &TrafficClass) -> Self {
        Self {
            id: c.id.to_string(),
            ext_id: c.class_ext_id,
            direction: c.direction.to_string(),
            min: c.min_rate.clone().unwrap_or_default(),
            max: c.max_rate.clone().unwrap_or_default(),
            parent: match (&c.parent, c.parent_class_ext_id) {
                (Some(p), Some(ext)) => format!("{p} [{ext}]"),
                (Some(p), None) => p.to_string(),
                (None, _) => String::new(),
            },
        }
    }
}

fn detail(c: &TrafficClass) -> String {
    [
        format!("ID:         {}", c.id),
        format!("Ext ID:     {}", c.class_ext_id),
        format!("Direction:  {}", c.direction),
        format!("Min rate:   {}", c.min_rate.as_deref().unwrap_or("-")),
        format!("Max rate:   {}", c.max_rate.as_deref().unwrap_or("-")),
        format!(
            "Parent:     {}",
            c.parent.as_ref().map_or_else(|| "-".into(), ToString::to_string)
        ),
        format!(
            "Parent ext: {}",
            c.parent_class_ext_id
                .map_or_else(|| "-".into(), |v| v.to_string())
        ),
    ]
    .join("\n")
}

fn direction(arg: DirectionArg) -> Direction {
    match arg {
        DirectionArg::Ingress => Direction::Ingress,
        DirectionArg::Egress => Direction::Egress,
        DirectionArg::Both => Direction::Both,
    }
}

fn id_of(c: &TrafficClass) -> String {
    c.id.to_string()
}

fn print_class(class: &TrafficClass, ctx: &Context) -> Result<(), CliError> {
    let out = output::render_single(ctx.output, class, detail, id_of)?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(
    registry: &Registry<BackendStore>,
    args: ClassesArgs,
    ctx: &Context,
) -> Result<(), CliError> {
    let classes = registry.classes();

    match args.command {
        ClassesCommand::Create {
            direction: dir,
            min,
            max,
            parent,
        } => {
            let class = classes.create_class(CreateClassRequest {
                direction: dir.map(direction),
                min_rate: min,
                max_rate: max,
                parent,
            })?;
            print_class(&class, ctx)
        }

        ClassesCommand::Update { id, min, max } => {
            let class = classes.update_class(
                &EntityId::from(id),
                UpdateClassRequest {
                    min_rate: min,
                    max_rate: max,
                },
            )?;
            print_class(&class, ctx)
        }

        ClassesCommand::Get { id } => {
            let class = classes
                .get_class(&EntityId::from(id.as_str()))?
                .ok_or_else(|| CliError::NotFound {
                    resource_type: "class".into(),
                    identifier: id,
                    list_command: "classes list".into(),
                })?;
            print_class(&class, ctx)
        }

        ClassesCommand::List => {
            let all = classes.list_classes()?;
            let out = output::render_list(ctx.output, &all, |c| ClassRow::from(c), id_of)?;
            output::print_output(&out, ctx.quiet);
            Ok(())
        }

        ClassesCommand::Delete { id } => {
            let entity = EntityId::from(id.as_str());
            if classes.get_class(&entity)?.is_none() {
                if !ctx.quiet {
                    eprintln!("Class {id} does not exist; nothing to delete");
                }
                return Ok(());
            }
            if !util::confirm("classes delete", &format!("Delete class {id}?"), ctx.yes)? {
                return Ok(());
            }
            classes.delete_class(&entity)?;
            if !ctx.quiet {
                eprintln!("Class {id} deleted");
            }
            Ok(())
        }

        ClassesCommand::Tree => {
            let tree = classes.get_tree()?;
            let out = output::render_tree(ctx.output, &tree)?;
            output::print_output(&out, ctx.quiet);
            Ok(())
        }
    }
}
