use crate::ServoConfig;

/// TowerPro SG90 micro servo, powered at 3.3 V.
pub const SG90: ServoConfig = ServoConfig {
    frequency_hz: 50,
    min_pulse_us: 600,
    max_pulse_us: 2400,
    angle_range_deg: 180,
};

/// TowerPro MG996R, 4.8 V to 6 V.
pub const MG996R: ServoConfig = ServoConfig {
    frequency_hz: 50,
    min_pulse_us: 500,
    max_pulse_us: 2500,
    angle_range_deg: 180,
};
