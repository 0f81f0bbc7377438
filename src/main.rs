mod config;
mod shapes;

use std::collections::BTreeSet;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use voxmap_geom::Vec3;
use voxmap_grid::{VoxelGrid, find_nearest_voxel_world};
use voxmap_io::{GridCodec, SerializedGrid};
use voxmap_mesh_cpu::VoxelMesh;
use voxmap_registry::{VoxelDef, VoxelRegistry};
use voxmap_runtime::{ContainsFn, GridGeneration, LogProgress};

use crate::config::GenerateConfig;
use crate::shapes::Solid;

#[derive(Parser)]
#[command(name = "voxmap", about = "Build, inspect and edit compressed voxel grids")]
struct Cli {
    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fill a grid from a solid described in a TOML file
    Generate {
        #[arg(long, short)]
        config: PathBuf,
        /// Output grid JSON path
        #[arg(long, short)]
        out: PathBuf,
        /// Include the text mirror of the payload
        #[arg(long)]
        debug_string: bool,
        /// Override the configured worker count
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Print dimensions and occupancy of a grid file
    Info { grid: PathBuf },
    /// Build the culled mesh and print batch statistics
    Mesh {
        grid: PathBuf,
        /// Voxel registry TOML; every id maps to one default material when omitted
        #[arg(long)]
        registry: Option<PathBuf>,
    },
    /// Find the occupied cell closest to a point
    Nearest {
        grid: PathBuf,
        #[arg(allow_negative_numbers = true)]
        x: f32,
        #[arg(allow_negative_numbers = true)]
        y: f32,
        #[arg(allow_negative_numbers = true)]
        z: f32,
        /// Interpret the point in world units
        #[arg(long)]
        world: bool,
    },
    /// Remove the voxel nearest a point and report the surface change
    Carve {
        grid: PathBuf,
        #[arg(allow_negative_numbers = true)]
        x: f32,
        #[arg(allow_negative_numbers = true)]
        y: f32,
        #[arg(allow_negative_numbers = true)]
        z: f32,
        #[arg(long)]
        world: bool,
        #[arg(long)]
        registry: Option<PathBuf>,
        /// Where to write the edited grid; defaults to overwriting the input
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Generate {
            config,
            out,
            debug_string,
            workers,
        } => generate(&config, &out, debug_string, workers),
        Command::Info { grid } => info(&grid),
        Command::Mesh { grid, registry } => mesh(&grid, registry.as_deref()),
        Command::Nearest {
            grid,
            x,
            y,
            z,
            world,
        } => nearest(&grid, Vec3::new(x, y, z), world),
        Command::Carve {
            grid,
            x,
            y,
            z,
            world,
            registry,
            out,
        } => carve(
            &grid,
            Vec3::new(x, y, z),
            world,
            registry.as_deref(),
            out.as_deref(),
        ),
    }
}

fn generate(
    config: &Path,
    out: &Path,
    debug_string: bool,
    workers: Option<usize>,
) -> Result<(), Box<dyn Error>> {
    let cfg = GenerateConfig::load(config)?;
    let solid: Arc<dyn Solid> = Arc::from(cfg.solid.build());
    let mut params = cfg.params(solid.as_ref());
    if let Some(w) = workers {
        params.workers = w;
    }
    let test = solid.clone();
    let contains: ContainsFn = Arc::new(move |p: Vec3| test.contains(p));

    let mut run = GridGeneration::start(params, contains)?;
    run.run(&mut LogProgress::new())?;
    let mut grid = run.into_grid().ok_or("generation did not finish")?;

    let codec = GridCodec::default().with_debug_string(debug_string);
    codec.serialize(&mut grid)?.save(out)?;
    println!(
        "wrote {} voxels ({}x{}x{}) to {}",
        grid.count(),
        grid.columns(),
        grid.rows(),
        grid.pages(),
        out.display()
    );
    Ok(())
}

fn load_grid(path: &Path) -> Result<VoxelGrid, Box<dyn Error>> {
    let record = SerializedGrid::load(path)?;
    Ok(GridCodec::default().deserialize(&record)?)
}

fn load_registry(path: Option<&Path>, grid: &VoxelGrid) -> Result<Arc<VoxelRegistry>, Box<dyn Error>> {
    let registry = match path {
        Some(p) => VoxelRegistry::load_from_path(p)?,
        None => {
            let ids: BTreeSet<_> = grid.occupied().map(|(_, id)| id).collect();
            VoxelRegistry::from_defs(ids.into_iter().map(|id| VoxelDef {
                id,
                name: None,
                material: "default".into(),
                mesh: None,
            }))?
        }
    };
    Ok(Arc::new(registry))
}

fn info(path: &Path) -> Result<(), Box<dyn Error>> {
    let grid = load_grid(path)?;
    let (c, r, p) = grid.dimensions();
    println!("dimensions: {c}x{r}x{p} ({} cells)", grid.len());
    println!("occupied:   {}", grid.count());
    println!("scale:      {}", grid.scale());
    println!("offset:     {}", grid.offset());
    println!("hash:       {}", grid.hash_code());
    Ok(())
}

fn mesh(path: &Path, registry: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let grid = load_grid(path)?;
    let registry = load_registry(registry, &grid)?;
    let mut mesh = VoxelMesh::new(registry.clone());
    mesh.rebuild(&grid);
    let s = mesh.stats();
    println!(
        "{} faces, {} batches, {} vertices, {} triangles",
        s.faces, s.batches, s.vertices, s.triangles
    );
    for batch in mesh.batches().iter().filter(|b| !b.faces().is_empty()) {
        println!(
            "  voxel {:>4} material {:<20} {:>6} faces",
            batch.voxel_id(),
            registry.material_key(batch.material()).unwrap_or("?"),
            batch.faces().len()
        );
    }
    if s.missing_ids > 0 {
        println!("{} voxel ids had no definition and were skipped", s.missing_ids);
    }
    Ok(())
}

fn nearest(path: &Path, point: Vec3, world: bool) -> Result<(), Box<dyn Error>> {
    let grid = load_grid(path)?;
    let found = if world {
        find_nearest_voxel_world(&grid, point)
    } else {
        grid.find_nearest_voxel(point)
    };
    match found {
        Some(pos) => println!("{pos} (voxel {})", grid.get_or_empty(pos)),
        None => println!("grid is empty"),
    }
    Ok(())
}

fn carve(
    path: &Path,
    point: Vec3,
    world: bool,
    registry: Option<&Path>,
    out: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let mut grid = load_grid(path)?;
    let target = if world {
        find_nearest_voxel_world(&grid, point)
    } else {
        grid.find_nearest_voxel(point)
    };
    let Some(pos) = target else {
        println!("grid is empty; nothing to carve");
        return Ok(());
    };
    let mut mesh = VoxelMesh::new(load_registry(registry, &grid)?);
    mesh.rebuild(&grid);
    let before = mesh.face_count();
    let removed = mesh.remove_voxel(&mut grid, pos)?;
    mesh.update();
    let after = mesh.face_count();
    log::debug!("carve stats after update: {:?}", mesh.stats());
    println!(
        "removed voxel {} at {pos}; faces {before} -> {after} ({:+})",
        removed.unwrap_or_default(),
        after as i64 - before as i64
    );

    let dest = out.unwrap_or(path);
    GridCodec::default().serialize(&mut grid)?.save(dest)?;
    println!("saved {}", dest.display());
    Ok(())
}
