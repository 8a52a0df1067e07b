use anyhow::Result;
use clap::Parser;
use lumen::loaders;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(version, about = "A physically-based offline ray tracer")]
struct Opts {
    /// Scene description file
    scene_file: PathBuf,

    /// Worker threads; 0 uses all hardware threads
    #[arg(short = 't', long = "threads", default_value_t = 0)]
    threads: usize,
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    if opts.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(opts.threads)
            .build_global()?;
    }

    let (scene, mut renderer) = loaders::load_scene(&opts.scene_file)?;
    renderer.preprocess(&scene);

    let start = Instant::now();
    renderer.render(&scene);
    tracing::info!(
        "completed rendering in {:.2} s",
        start.elapsed().as_secs_f64()
    );

    renderer.camera.film().write_image_to_file(1.0)?;
    Ok(())
}
