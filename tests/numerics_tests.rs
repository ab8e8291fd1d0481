use inkwash::{
    ChannelFormat, CpuDevice, FieldId, GridBuffer, PassDevice, PassKind, PassUniforms,
    VISCOSITY, diffusion_coefficients,
};

fn device_with_fields(n: usize) -> CpuDevice {
    let mut device = CpuDevice::new(n, n);
    let seed = GridBuffer::new(ChannelFormat::Rgba8Unorm, n, n);
    device.init_fields(&seed).expect("field allocation");
    device
}

/// Largest |divergence| away from the clamped boundary ring.
fn interior_max(field: &GridBuffer) -> f32 {
    let n = field.width();
    let mut max = 0.0f32;
    for y in 2..n - 2 {
        for x in 2..n - 2 {
            max = max.max(field.texel(x as i32, y as i32)[0].abs());
        }
    }
    max
}

#[test]
fn test_advection_translates_by_velocity_times_delta() {
    const N: usize = 16;
    let mut device = device_with_fields(N);

    // Uniform rightward velocity; dt chosen so the backtrace lands exactly
    // two texels upstream.
    {
        let velocity = device.field_mut(FieldId::Velocity1).unwrap();
        for y in 0..N {
            for x in 0..N {
                velocity.set_texel(x, y, [0.5, 0.0, 0.0, 0.0]);
            }
        }
        let ink = device.field_mut(FieldId::Color1).unwrap();
        ink.set_texel(5, 8, [1.0, 0.0, 0.0, 1.0]);
    }

    let delta_time = 4.0 / N as f32;
    device
        .draw(
            FieldId::Color2,
            &[FieldId::Color1, FieldId::Velocity1],
            PassKind::Advect,
            &PassUniforms {
                delta_time,
                ..Default::default()
            },
        )
        .expect("advect");

    let ink = device.field(FieldId::Color2).unwrap();
    assert!(
        (ink.texel(7, 8)[0] - 1.0).abs() < 1e-6,
        "the spike should arrive two texels downstream, got {}",
        ink.texel(7, 8)[0]
    );
    assert!(
        ink.texel(5, 8)[0].abs() < 1e-6,
        "the original location should have been vacated"
    );
}

#[test]
fn test_advection_is_stable_under_large_deltas() {
    const N: usize = 32;
    let mut device = device_with_fields(N);

    {
        let velocity = device.field_mut(FieldId::Velocity1).unwrap();
        for y in 0..N {
            for x in 0..N {
                // Swirling velocity far larger than a sane frame would carry.
                velocity.set_texel(x, y, [(x as f32).sin() * 10.0, (y as f32).cos() * 10.0, 0.0, 0.0]);
            }
        }
    }
    let bound = device.field(FieldId::Velocity1).unwrap().max_abs();

    device
        .draw(
            FieldId::Velocity2,
            &[FieldId::Velocity1, FieldId::Velocity1],
            PassKind::Advect,
            &PassUniforms {
                delta_time: 1.0,
                ..Default::default()
            },
        )
        .expect("advect");

    // Semi-Lagrangian transport interpolates existing values, so no texel
    // can exceed the source range no matter how long the step.
    let advected = device.field(FieldId::Velocity2).unwrap().max_abs();
    assert!(
        advected <= bound + 1e-5,
        "advection overshot: {advected} > {bound}"
    );
}

#[test]
fn test_diffusion_relaxation_spreads_a_spike() {
    const N: usize = 33;
    let mut device = device_with_fields(N);
    let center = (N / 2) as i32;

    // Spike source in Velocity1 (the fixed term), iterate starts equal to it
    // in Velocity2, and sweeps ping-pong through Velocity3.
    for id in [FieldId::Velocity1, FieldId::Velocity2] {
        device
            .field_mut(id)
            .unwrap()
            .set_texel(center as usize, center as usize, [1.0, 0.0, 0.0, 0.0]);
    }

    let grid_dx = 1.0 / N as f32;
    let (alpha, beta) = diffusion_coefficients(grid_dx * grid_dx / VISCOSITY, 1.0 / 60.0);
    let sweep = PassUniforms {
        alpha,
        beta,
        ..Default::default()
    };

    let mut previous_center = 1.0f32;
    let mut previous_neighbor = 0.0f32;
    for pair in 0..2 {
        device
            .draw(
                FieldId::Velocity3,
                &[FieldId::Velocity2, FieldId::Velocity1],
                PassKind::JacobiVector,
                &sweep,
            )
            .expect("sweep");
        device
            .draw(
                FieldId::Velocity2,
                &[FieldId::Velocity3, FieldId::Velocity1],
                PassKind::JacobiVector,
                &sweep,
            )
            .expect("sweep");

        let iterate = device.field(FieldId::Velocity2).unwrap();
        let center_value = iterate.texel(center, center)[0];
        let neighbor_value = iterate.texel(center + 1, center)[0];
        assert!(
            center_value < previous_center,
            "sweep pair {pair}: spike should keep shrinking ({center_value} >= {previous_center})"
        );
        assert!(
            neighbor_value > previous_neighbor,
            "sweep pair {pair}: mass should keep spreading ({neighbor_value} <= {previous_neighbor})"
        );
        previous_center = center_value;
        previous_neighbor = neighbor_value;
    }
}

#[test]
fn test_divergence_of_uniform_flow_is_zero() {
    const N: usize = 32;
    let mut device = device_with_fields(N);
    {
        let velocity = device.field_mut(FieldId::Velocity2).unwrap();
        for y in 0..N {
            for x in 0..N {
                velocity.set_texel(x, y, [0.3, -0.2, 0.0, 0.0]);
            }
        }
    }

    device
        .draw(
            FieldId::Velocity3,
            &[FieldId::Velocity2],
            PassKind::Divergence,
            &PassUniforms::default(),
        )
        .expect("divergence");

    assert!(
        device.field(FieldId::Velocity3).unwrap().max_abs() < 1e-6,
        "uniform flow has zero divergence everywhere, edges included"
    );
}

#[test]
fn test_projection_reduces_interior_divergence() {
    const N: usize = 64;
    let mut device = device_with_fields(N);
    let grid_dx = 1.0 / N as f32;

    // A radially exploding Gaussian blob: strongly divergent in the interior.
    {
        let velocity = device.field_mut(FieldId::Velocity2).unwrap();
        for y in 0..N {
            for x in 0..N {
                let u = (x as f32 + 0.5) / N as f32 - 0.5;
                let v = (y as f32 + 0.5) / N as f32 - 0.5;
                let g = (-(u * u + v * v) * 80.0).exp();
                velocity.set_texel(x, y, [u * g, v * g, 0.0, 0.0]);
            }
        }
    }

    device
        .draw(
            FieldId::Velocity3,
            &[FieldId::Velocity2],
            PassKind::Divergence,
            &PassUniforms::default(),
        )
        .expect("divergence");
    let before = interior_max(device.field(FieldId::Velocity3).unwrap());
    assert!(before > 1.0, "the blob should start clearly divergent");

    device.clear(FieldId::Pressure1).expect("clear");
    let relax = PassUniforms {
        alpha: -grid_dx * grid_dx,
        beta: 4.0,
        ..Default::default()
    };
    for _ in 0..15 {
        device
            .draw(
                FieldId::Pressure2,
                &[FieldId::Pressure1, FieldId::Velocity3],
                PassKind::JacobiScalar,
                &relax,
            )
            .expect("relax");
        device
            .draw(
                FieldId::Pressure1,
                &[FieldId::Pressure2, FieldId::Velocity3],
                PassKind::JacobiScalar,
                &relax,
            )
            .expect("relax");
    }
    device
        .draw(
            FieldId::Velocity1,
            &[FieldId::Velocity2, FieldId::Pressure1],
            PassKind::GradientSubtract,
            &PassUniforms::default(),
        )
        .expect("gradient subtract");

    device
        .draw(
            FieldId::Velocity3,
            &[FieldId::Velocity1],
            PassKind::Divergence,
            &PassUniforms::default(),
        )
        .expect("divergence");
    let after = interior_max(device.field(FieldId::Velocity3).unwrap());

    assert!(
        after < 0.7 * before,
        "projection should cut interior divergence well below its start \
         ({after} vs {before})"
    );
}
