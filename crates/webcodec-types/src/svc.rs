// crates/webcodec-types/src/svc.rs
//
// Temporal-layer id mapping for the L1T1/L1T2/L1T3 scalability modes.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalabilityMode {
    L1T1,
    L1T2,
    L1T3,
}

impl ScalabilityMode {
    pub fn num_temporal_layers(&self) -> u32 {
        match self {
            ScalabilityMode::L1T1 => 1,
            ScalabilityMode::L1T2 => 2,
            ScalabilityMode::L1T3 => 3,
        }
    }

    pub fn parse(mode: &str) -> Option<ScalabilityMode> {
        match mode {
            "L1T1" => Some(ScalabilityMode::L1T1),
            "L1T2" => Some(ScalabilityMode::L1T2),
            "L1T3" => Some(ScalabilityMode::L1T3),
            _ => None,
        }
    }
}

/// The temporal-layer id for `frame_index` under `mode`:
/// L=1 is always 0; L=2 alternates; L=3 uses the `[0,2,1,2]` pyramid.
pub fn temporal_layer_id(mode: ScalabilityMode, frame_index: u64) -> u32 {
    match mode.num_temporal_layers() {
        1 => 0,
        2 => (frame_index & 1) as u32,
        _ => [0, 2, 1, 2][(frame_index % 4) as usize],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_layer_is_always_zero() {
        for i in 0..8 {
            assert_eq!(temporal_layer_id(ScalabilityMode::L1T1, i), 0);
        }
    }

    #[test]
    fn two_layers_alternate() {
        let ids: Vec<u32> = (0..4).map(|i| temporal_layer_id(ScalabilityMode::L1T2, i)).collect();
        assert_eq!(ids, vec![0, 1, 0, 1]);
    }

    #[test]
    fn three_layers_follow_the_pyramid_pattern() {
        let ids: Vec<u32> = (0..8).map(|i| temporal_layer_id(ScalabilityMode::L1T3, i)).collect();
        assert_eq!(ids, vec![0, 2, 1, 2, 0, 2, 1, 2]);
    }
}
