use inkwash::{
    ChannelFormat, CpuDevice, FieldId, GridBuffer, PassDevice, PassKind, PassUniforms,
    SolverError,
};

const N: usize = 16;

fn device_with_fields() -> CpuDevice {
    let mut device = CpuDevice::new(N, N);
    let seed = GridBuffer::new(ChannelFormat::Rgba8Unorm, N, N);
    device.init_fields(&seed).expect("field allocation");
    device
}

#[test]
fn test_draw_before_init_fails() {
    let mut device = CpuDevice::new(N, N);
    let result = device.draw(
        FieldId::Velocity2,
        &[FieldId::Velocity1],
        PassKind::Passthrough,
        &PassUniforms::default(),
    );
    assert!(matches!(result, Err(SolverError::FieldsUninitialized)));
}

#[test]
fn test_draw_rejects_reading_its_own_target() {
    let mut device = device_with_fields();
    let result = device.draw(
        FieldId::Velocity1,
        &[FieldId::Velocity1, FieldId::Velocity1],
        PassKind::Advect,
        &PassUniforms::default(),
    );
    assert!(
        matches!(result, Err(SolverError::SelfFeedback(FieldId::Velocity1))),
        "a buffer bound as both source and target must be rejected"
    );
}

#[test]
fn test_copy_onto_itself_fails_and_leaves_contents_alone() {
    let mut device = device_with_fields();
    device
        .field_mut(FieldId::Velocity2)
        .unwrap()
        .set_texel(3, 4, [0.5, -0.25, 0.0, 0.0]);

    let result = device.copy(FieldId::Velocity2, FieldId::Velocity2);
    assert!(matches!(result, Err(SolverError::SelfFeedback(_))));

    let texel = device.field(FieldId::Velocity2).unwrap().texel(3, 4);
    assert_eq!(
        &texel[..2],
        &[0.5, -0.25],
        "a rejected copy must not touch the buffer"
    );
}

#[test]
fn test_draw_rejects_wrong_input_count() {
    let mut device = device_with_fields();

    // Advection reads two buffers: the quantity and the carrying velocity.
    let result = device.draw(
        FieldId::Velocity2,
        &[FieldId::Velocity1],
        PassKind::Advect,
        &PassUniforms::default(),
    );
    match result {
        Err(SolverError::InputArity {
            expected: 2,
            got: 1,
            ..
        }) => {}
        other => panic!("expected an input arity error, got {other:?}"),
    }
}

#[test]
fn test_copy_reproduces_source_exactly() {
    let mut device = device_with_fields();
    {
        let source = device.field_mut(FieldId::Velocity1).unwrap();
        for y in 0..N {
            for x in 0..N {
                source.set_texel(x, y, [x as f32 * 0.1, y as f32 * -0.1, 0.0, 0.0]);
            }
        }
    }

    device
        .copy(FieldId::Velocity1, FieldId::Velocity2)
        .expect("copy");

    let source = device.field(FieldId::Velocity1).unwrap().data().to_vec();
    let copied = device.field(FieldId::Velocity2).unwrap().data().to_vec();
    assert_eq!(source, copied, "a passthrough at texel centers is exact");
}

#[test]
fn test_clear_zero_fills() {
    let mut device = device_with_fields();
    device
        .field_mut(FieldId::Pressure1)
        .unwrap()
        .data_mut()
        .fill(7.5);

    device.clear(FieldId::Pressure1).expect("clear");

    assert_eq!(device.field(FieldId::Pressure1).unwrap().max_abs(), 0.0);
}

#[test]
fn test_present_clamps_to_displayable_range() {
    let mut device = device_with_fields();
    {
        let ink = device.field_mut(FieldId::Color1).unwrap();
        ink.set_texel(0, 0, [2.0, -1.0, 0.5, 1.0]);
    }

    device
        .present(FieldId::Color1, PassKind::Passthrough)
        .expect("present");

    let frame = device.frame();
    assert_eq!(frame[0], 255, "values above 1 clamp to full intensity");
    assert_eq!(frame[1], 0, "negative values clamp to black");
    assert_eq!(frame[2], 127, "in-range values quantize linearly");
    assert_eq!(frame[3], 255);
}

#[test]
fn test_field_pool_formats() {
    let device = device_with_fields();
    for id in FieldId::ALL {
        let field = device.field(id).unwrap();
        assert_eq!(field.width(), N);
        assert_eq!(field.height(), N);
        assert_eq!(field.format(), id.format());
    }
    assert_eq!(FieldId::Velocity1.format(), ChannelFormat::Rg32Float);
    assert_eq!(FieldId::Pressure1.format(), ChannelFormat::R32Float);
    assert_eq!(FieldId::Color1.format(), ChannelFormat::Rgba8Unorm);
}
