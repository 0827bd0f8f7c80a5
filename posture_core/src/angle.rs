/// Planar landmark position, normalized to [0, 1] of the image dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Angle in degrees of the shoulder-to-ear vector, as `atan2` yields it:
/// signed, in (-180, 180]. Image coordinates grow downward, so an upright
/// pose (ear above shoulder) comes out negative; the classifier negates it.
///
/// Coincident points yield 0, which lies outside every accepted range.
pub fn neck_angle(shoulder: Point2, ear: Point2) -> f32 {
    (ear.y - shoulder.y).atan2(ear.x - shoulder.x).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_vector_is_zero_degrees() {
        let angle = neck_angle(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0));
        assert_eq!(angle, 0.0);
    }

    #[test]
    fn vertical_vector_is_ninety_degrees() {
        let angle = neck_angle(Point2::new(0.0, 0.0), Point2::new(0.0, 1.0));
        assert_eq!(angle, 90.0);
    }

    #[test]
    fn ear_above_shoulder_is_negative_in_image_coordinates() {
        // y grows downward: the ear sits at a smaller y than the shoulder.
        let angle = neck_angle(Point2::new(0.5, 0.6), Point2::new(0.5, 0.3));
        assert_eq!(angle, -90.0);
    }

    #[test]
    fn opposite_direction_is_one_hundred_eighty_degrees() {
        let angle = neck_angle(Point2::new(1.0, 1.0), Point2::new(0.0, 1.0));
        assert_eq!(angle, 180.0);
    }

    #[test]
    fn coincident_points_collapse_to_zero() {
        let p = Point2::new(0.42, 0.42);
        assert_eq!(neck_angle(p, p), 0.0);
    }

    #[test]
    fn same_inputs_same_angle() {
        let shoulder = Point2::new(0.48, 0.55);
        let ear = Point2::new(0.51, 0.31);
        assert_eq!(neck_angle(shoulder, ear), neck_angle(shoulder, ear));
    }
}
