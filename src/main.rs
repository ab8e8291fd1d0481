use inkwash::{
    AnalysisRecorder, ChannelFormat, CpuDevice, FieldId, FieldMetrics, FluidSolver, GridBuffer,
    ImageExporter, PassDevice, SIM_SIZE, SeedHandle,
};
use std::path::{Path, PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "test" {
        run_headless_test()?;
    } else if args.len() > 1 && args[1] == "gpu" {
        #[cfg(feature = "gpu")]
        run_gpu_headless()?;
        #[cfg(not(feature = "gpu"))]
        return Err("gpu mode requires building with --features gpu".into());
    } else {
        let seed_path = args
            .get(1)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("image.png"));
        run_gui_app(seed_path);
    }

    Ok(())
}

fn run_headless_test() -> Result<(), Box<dyn std::error::Error>> {
    println!("Running headless stable-fluids test with divergence analysis...");

    let device = CpuDevice::new(SIM_SIZE, SIM_SIZE);
    let seed = SeedHandle::ready(synthetic_seed(SIM_SIZE));
    let mut solver = FluidSolver::new(device, seed);
    let mut recorder = AnalysisRecorder::new();

    // Tick 0 allocates the fields, tick 1 primes the timestamp baseline.
    solver.on_frame(0.0)?;
    solver.on_frame(0.0)?;

    for frame in 1..=60usize {
        let timestamp_ms = frame as f64 * 1000.0 / 60.0;
        solver.on_frame(timestamp_ms)?;

        let velocity = solver
            .device()
            .field(FieldId::Velocity1)
            .expect("fields allocated");
        recorder.record_frame(velocity, frame);

        if frame % 10 == 0 {
            FieldMetrics::measure(velocity, frame).print_summary();

            let frame_path = format!("test_frame_{frame:04}.png");
            let velocity_path = format!("test_velocity_{frame:04}.png");
            ImageExporter::export_frame_png(
                solver.device().frame(),
                SIM_SIZE as u32,
                SIM_SIZE as u32,
                Path::new(&frame_path),
            )?;
            ImageExporter::export_velocity_png(velocity, Path::new(&velocity_path))?;
        }
    }

    recorder.print_trends();
    println!("Test completed.");
    Ok(())
}

/// Headless run on the wgpu backend. Async device setup is blocked on with
/// a tokio runtime; the tick loop itself is synchronous.
#[cfg(feature = "gpu")]
fn run_gpu_headless() -> Result<(), Box<dyn std::error::Error>> {
    use inkwash::{GpuContext, WgpuDevice};

    println!("Running headless stable-fluids test on the wgpu backend...");

    let rt = tokio::runtime::Runtime::new()?;
    let ctx = rt.block_on(GpuContext::new())?;
    let device = rt.block_on(WgpuDevice::new(ctx, SIM_SIZE as u32, SIM_SIZE as u32))?;
    let mut solver = FluidSolver::new(device, SeedHandle::ready(synthetic_seed(SIM_SIZE)));

    solver.on_frame(0.0)?;
    solver.on_frame(0.0)?;
    for frame in 1..=60usize {
        solver.on_frame(frame as f64 * 1000.0 / 60.0)?;
    }

    ImageExporter::export_frame_png(
        solver.device().frame(),
        SIM_SIZE as u32,
        SIM_SIZE as u32,
        Path::new("gpu_frame.png"),
    )?;
    println!("Test completed.");
    Ok(())
}

/// A swirl of red/green gradients standing in for a user picture; red and
/// green become the initial velocity components.
fn synthetic_seed(size: usize) -> GridBuffer {
    let mut seed = GridBuffer::new(ChannelFormat::Rgba8Unorm, size, size);
    for y in 0..size {
        for x in 0..size {
            let u = (x as f32 + 0.5) / size as f32;
            let v = (y as f32 + 0.5) / size as f32;
            let r = 0.5 + 0.4 * (std::f32::consts::TAU * v).sin();
            let g = 0.5 + 0.4 * (std::f32::consts::TAU * u).cos();
            let b = 0.5 * (u + v);
            seed.set_texel(x, y, [r, g, b, 1.0]);
        }
    }
    seed
}

fn run_gui_app(seed_path: PathBuf) {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([640.0, 640.0])
            .with_title("inkwash - stable fluids"),
        ..Default::default()
    };

    let device = CpuDevice::new(SIM_SIZE, SIM_SIZE);
    let seed = SeedHandle::load(seed_path, SIM_SIZE as u32, SIM_SIZE as u32);
    let solver = FluidSolver::new(device, seed);

    eframe::run_native(
        "inkwash",
        options,
        Box::new(|_cc| Box::new(inkwash::InkwashApp::new(solver))),
    )
    .unwrap();
}
