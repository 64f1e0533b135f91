#[cfg(test)]
mod tests {

    use crate::core::CameraAngle;
    use crate::gui::camera_grid::stream_time_label;
    use crate::video::fake_media::FakeMedia;

    #[test]
    fn test_time_label_with_known_duration() {
        let (media, probe) = FakeMedia::ready(CameraAngle::Front, 61.0);
        probe.set_position(5.0);

        assert_eq!(stream_time_label(&media), "0:05 / 1:01");
    }

    #[test]
    fn test_time_label_without_duration_shows_position_only() {
        // A stream whose probe never ran still plays once the batch is ready.
        let (media, probe) = FakeMedia::pending(CameraAngle::Back);
        probe.set_position(12.0);

        assert_eq!(stream_time_label(&media), "0:12");
    }
}
