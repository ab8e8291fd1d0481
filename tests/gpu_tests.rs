#![cfg(feature = "gpu")]

use inkwash::{
    ChannelFormat, FluidSolver, GpuContext, GridBuffer, PassDevice, SeedHandle, WgpuDevice,
};

const N: usize = 16;

fn gradient_seed(n: usize) -> GridBuffer {
    let mut seed = GridBuffer::new(ChannelFormat::Rgba8Unorm, n, n);
    for y in 0..n {
        for x in 0..n {
            let r = x as f32 / (n - 1) as f32;
            let g = y as f32 / (n - 1) as f32;
            seed.set_texel(x, y, [r, g, 0.0, 1.0]);
        }
    }
    seed
}

#[tokio::test]
async fn test_gpu_device_creation() {
    let ctx = GpuContext::new().await;
    assert!(ctx.is_ok(), "GPU context creation should succeed");

    let device = WgpuDevice::new(ctx.unwrap(), N as u32, N as u32).await;
    assert!(device.is_ok(), "GPU pass device creation should succeed");
    assert_eq!(device.unwrap().size(), (N, N));
}

#[tokio::test]
async fn test_gpu_solver_runs_frames() {
    let ctx = GpuContext::new().await.unwrap();
    let device = WgpuDevice::new(ctx, N as u32, N as u32).await.unwrap();
    let mut solver = FluidSolver::new(device, SeedHandle::ready(gradient_seed(N)));

    solver.on_frame(0.0).expect("init tick");
    solver.on_frame(0.0).expect("priming tick");
    for frame in 1..=10usize {
        solver
            .on_frame(frame as f64 * 1000.0 / 60.0)
            .expect("simulated tick");
    }

    assert!(solver.is_ready());
    let frame = solver.device().frame();
    assert_eq!(frame.len(), N * N * 4);
    assert!(
        frame.iter().any(|&byte| byte != 0),
        "a seeded simulation should present a non-black frame"
    );
}

#[tokio::test]
async fn test_gpu_rejects_self_feedback_draw() {
    use inkwash::{FieldId, PassKind, PassUniforms, SolverError};

    let ctx = GpuContext::new().await.unwrap();
    let mut device = WgpuDevice::new(ctx, N as u32, N as u32).await.unwrap();
    device
        .init_fields(&gradient_seed(N))
        .expect("field allocation");

    let result = device.draw(
        FieldId::Velocity1,
        &[FieldId::Velocity1, FieldId::Velocity1],
        PassKind::Advect,
        &PassUniforms::default(),
    );
    assert!(
        matches!(result, Err(SolverError::SelfFeedback(FieldId::Velocity1))),
        "the GPU backend enforces the same draw contract as the software one"
    );
}
