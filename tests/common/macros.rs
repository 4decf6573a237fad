/// Asserts the stored evolution stage of a cat.
#[macro_export]
macro_rules! assert_stage {
    ($engine:expr, $cat_id:expr, $stage:expr) => {
        let stage = $engine
            .evolution
            .stage($cat_id)
            .expect("Failed to read evolution stage");
        assert_eq!(stage, $stage, "Cat {} is at the wrong stage", $cat_id);
    };
}

/// Asserts the stored experience total of a cat.
#[macro_export]
macro_rules! assert_experience {
    ($engine:expr, $cat_id:expr, $points:expr) => {
        let data = $engine
            .evolution
            .evolution_data($cat_id)
            .expect("Failed to read evolution data")
            .expect("Cat has no evolution data");
        assert_eq!(
            data.experience_points, $points,
            "Cat {} experience mismatch",
            $cat_id
        );
    };
}

/// Asserts that no genetic profile is stored for a cat.
#[macro_export]
macro_rules! assert_no_profile {
    ($engine:expr, $cat_id:expr) => {
        let profile = $engine
            .genetics
            .profile($cat_id)
            .expect("Failed to read profile");
        assert!(
            profile.is_none(),
            "Cat {} should have no genetic profile",
            $cat_id
        );
    };
}
