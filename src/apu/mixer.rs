/// Channel levels as produced by each channel's `output()`
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelLevels {
    pub pulse1: u8,
    pub pulse2: u8,
    pub triangle: u8,
    pub noise: u8,
    pub dmc: u8,
}

/// Nonlinear DAC approximation, output in 0.0..=1.0
pub fn mix(levels: ChannelLevels) -> f32 {
    let pulse_sum = f32::from(levels.pulse1) + f32::from(levels.pulse2);
    let pulse_out = if pulse_sum == 0.0 {
        0.0
    } else {
        95.88 / (8128.0 / pulse_sum + 100.0)
    };

    let tnd_sum = f32::from(levels.triangle) / 8227.0
        + f32::from(levels.noise) / 12241.0
        + f32::from(levels.dmc) / 22638.0;
    let tnd_out = if tnd_sum == 0.0 {
        0.0
    } else {
        159.79 / (1.0 / tnd_sum + 100.0)
    };

    pulse_out + tnd_out
}
