use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use inkwash::{
    ChannelFormat, CpuDevice, FieldId, FluidSolver, GridBuffer, PassDevice, PassKind,
    PassUniforms, SeedHandle,
};

fn seed(n: usize) -> GridBuffer {
    let mut buffer = GridBuffer::new(ChannelFormat::Rgba8Unorm, n, n);
    for y in 0..n {
        for x in 0..n {
            let u = x as f32 / (n - 1) as f32;
            let v = y as f32 / (n - 1) as f32;
            buffer.set_texel(x, y, [u, v, (u * v).fract(), 1.0]);
        }
    }
    buffer
}

fn device_with_fields(n: usize) -> CpuDevice {
    let mut device = CpuDevice::new(n, n);
    device.init_fields(&seed(n)).expect("field allocation");
    device
}

fn benchmark_full_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_tick");

    for size in [128usize, 256, 512] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let device = CpuDevice::new(size, size);
            let mut solver = FluidSolver::new(device, SeedHandle::ready(seed(size)));
            solver.on_frame(0.0).expect("init tick");
            solver.on_frame(0.0).expect("priming tick");

            let mut timestamp = 0.0;
            b.iter(|| {
                timestamp += 1000.0 / 60.0;
                black_box(solver.on_frame(timestamp)).expect("tick");
            });
        });
    }
    group.finish();
}

fn benchmark_passes(c: &mut Criterion) {
    let mut group = c.benchmark_group("passes");
    let mut device = device_with_fields(512);

    let advect = PassUniforms {
        delta_time: 1.0 / 60.0,
        ..Default::default()
    };
    group.bench_function("advect_512", |b| {
        b.iter(|| {
            device
                .draw(
                    FieldId::Velocity2,
                    &[FieldId::Velocity1, FieldId::Velocity1],
                    PassKind::Advect,
                    &advect,
                )
                .expect("advect");
        });
    });

    let sweep = PassUniforms {
        alpha: 25.0,
        beta: 29.0,
        ..Default::default()
    };
    group.bench_function("jacobi_sweep_512", |b| {
        b.iter(|| {
            device
                .draw(
                    FieldId::Velocity3,
                    &[FieldId::Velocity2, FieldId::Velocity1],
                    PassKind::JacobiVector,
                    &sweep,
                )
                .expect("sweep");
        });
    });

    group.bench_function("divergence_512", |b| {
        b.iter(|| {
            device
                .draw(
                    FieldId::Velocity3,
                    &[FieldId::Velocity2],
                    PassKind::Divergence,
                    &PassUniforms::default(),
                )
                .expect("divergence");
        });
    });

    group.bench_function("present_512", |b| {
        b.iter(|| {
            device
                .present(FieldId::Color1, PassKind::Passthrough)
                .expect("present");
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_full_tick, benchmark_passes);
criterion_main!(benches);
