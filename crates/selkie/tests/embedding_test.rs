use selkie::{
    Coords, Embedding, EmbeddingOptions, Error, SearchOptions, SimilarityRecord,
    SimilarityTransform,
};

fn one_minus(seed: u64) -> EmbeddingOptions {
    EmbeddingOptions {
        transform: SimilarityTransform::OneMinus,
        random_seed: seed,
        ..Default::default()
    }
}

fn distance(e: &Embedding, a: &str, b: &str) -> f64 {
    let a = e.entity(a).unwrap().position();
    let b = e.entity(b).unwrap().position();
    a.distance_to(b).unwrap()
}

#[test]
fn two_partners_of_the_reference_settle_and_orient() {
    let records = [
        SimilarityRecord::new("A", "B", 0.9),
        SimilarityRecord::new("A", "C", 0.5),
    ];
    let mut e = Embedding::from_records(&records, "A", one_minus(17)).unwrap();
    assert_eq!(e.len(), 3);
    assert_eq!(e.labels().collect::<Vec<_>>(), vec!["A", "B", "C"]);

    let field = e.field();
    assert!(field.ideal_distance(0, 1) < field.ideal_distance(0, 2));
    // B and C were never compared, so they sit at the weakest observed similarity.
    assert_eq!(field.ideal_distance(1, 2), field.distance_from_similarity(0.5));

    let options = SearchOptions {
        number_of_starts: 4,
        initial_iterations: 200,
        final_iterations: 3000,
    };
    selkie::optimize(&mut e, &options).unwrap();
    e.normalize_orientation().unwrap();

    let b = e.entity("B").unwrap().position();
    assert!(b.get(0).unwrap() > 0.0, "B = {b}");
    assert!(b.get(1).unwrap().abs() < 1e-9, "B = {b}");
    let c = e.entity("C").unwrap().position();
    assert!(c.get(1).unwrap() >= 0.0, "C = {c}");
    assert!(e.reference_entity().unwrap().position().is_origin());

    assert!((distance(&e, "A", "B") - 0.1).abs() < 0.01);
    assert!((distance(&e, "A", "C") - 0.5).abs() < 0.01);
    assert!((distance(&e, "B", "C") - 0.5).abs() < 0.01);
    e.check_clock().unwrap();
}

#[test]
fn never_observed_pairs_take_the_minimum_similarity() {
    let records = [
        SimilarityRecord::new("A", "B", 0.3),
        SimilarityRecord::new("C", "D", 0.8),
    ];
    let e = Embedding::from_records(&records, "A", one_minus(1)).unwrap();
    let bounds = e.bounds().unwrap();
    assert_eq!((bounds.min, bounds.max), (0.3, 0.8));

    let (a, c) = (e.slot_of("A").unwrap(), e.slot_of("C").unwrap());
    assert_eq!(
        e.field().ideal_distance(a, c),
        e.field().distance_from_similarity(0.3)
    );
    assert!(e.field().is_present(a, c));
    assert!(e.field().is_present(c, a));
}

#[test]
fn imputation_can_be_switched_off() {
    let records = [
        SimilarityRecord::new("A", "B", 0.3),
        SimilarityRecord::new("C", "D", 0.8),
    ];
    let options = EmbeddingOptions {
        set_missing_to_min: false,
        ..one_minus(1)
    };
    let e = Embedding::from_records(&records, "A", options).unwrap();
    assert!(!e.field().is_present(0, 2));
    assert_eq!(e.field().ideal_distance(0, 2), 0.0);
}

#[test]
fn later_records_for_a_pair_overwrite_earlier_ones() {
    let records = [
        SimilarityRecord::new("A", "B", 0.2),
        SimilarityRecord::new("B", "A", 0.6),
    ];
    let e = Embedding::from_records(&records, "A", one_minus(1)).unwrap();
    assert_eq!(e.field().ideal_distance(0, 1), 1.0 - 0.6);
}

#[test]
fn every_step_recentres_on_the_reference() {
    let records = [
        SimilarityRecord::new("x", "y", 0.7),
        SimilarityRecord::new("y", "z", 0.4),
        SimilarityRecord::new("z", "w", 0.2),
    ];
    let mut e = Embedding::from_records(&records, "z", EmbeddingOptions::default()).unwrap();
    for _ in 0..25 {
        e.step().unwrap();
        assert!(e.entity("z").unwrap().position().is_origin());
        assert!(e.sum_error() >= 0.0);
    }
}

#[test]
fn a_step_is_reproducible() {
    let records = [
        SimilarityRecord::new("p", "q", 0.61),
        SimilarityRecord::new("q", "r", 0.42),
        SimilarityRecord::new("p", "s", 0.33),
        SimilarityRecord::new("r", "s", 0.95),
    ];
    let mut first = Embedding::from_records(&records, "p", EmbeddingOptions::default()).unwrap();
    for _ in 0..10 {
        first.step().unwrap();
    }
    let mut second = first.clone();

    let e1 = first.step().unwrap();
    let e2 = second.step().unwrap();
    assert_eq!(e1.to_bits(), e2.to_bits());
    for (a, b) in first.clone_positions().iter().zip(second.clone_positions()) {
        for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }
}

#[test]
fn same_seed_gives_the_same_layout() {
    let records = [
        SimilarityRecord::new("a", "b", 0.5),
        SimilarityRecord::new("b", "c", 0.5),
        SimilarityRecord::new("c", "a", 0.5),
    ];
    let options = SearchOptions {
        number_of_starts: 3,
        initial_iterations: 50,
        final_iterations: 100,
    };
    let run = || {
        let mut e = Embedding::from_records(&records, "a", one_minus(99)).unwrap();
        selkie::optimize(&mut e, &options).unwrap();
        e.normalize_orientation().unwrap();
        e.to_string()
    };
    assert_eq!(run(), run());
}

#[test]
fn excluded_reference_leaves_the_rest_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pairs.txt");
    std::fs::write(&path, "hub a 0.9\nhub b 0.8\na b 0.5\nb c 0.4\nbad line\n").unwrap();

    let options = EmbeddingOptions {
        include_reference: false,
        ..one_minus(4)
    };
    let mut e = Embedding::load(&path, "hub", options).unwrap();
    assert_eq!(e.labels().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    assert!(e.entity("hub").is_none());
    assert_eq!(e.reference_slot(), None);

    selkie::relax(&mut e, 50).unwrap();
    e.normalize_orientation().unwrap();
    let a = e.entity("a").unwrap().position();
    assert!(a.get(1).unwrap().abs() < 1e-9);
    assert!(e.placements().iter().all(|p| !p.is_reference));
}

#[test]
fn three_dimensional_runs_orient_in_the_first_plane() {
    let records = [
        SimilarityRecord::new("o", "u", 0.5),
        SimilarityRecord::new("o", "v", 0.5),
        SimilarityRecord::new("o", "w", 0.5),
        SimilarityRecord::new("u", "v", 0.5),
        SimilarityRecord::new("v", "w", 0.5),
        SimilarityRecord::new("u", "w", 0.5),
    ];
    let options = EmbeddingOptions {
        dimensions: 3,
        ..one_minus(8)
    };
    let mut e = Embedding::from_records(&records, "o", options).unwrap();
    selkie::relax(&mut e, 2000).unwrap();
    e.normalize_orientation().unwrap();
    let u = e.entity("u").unwrap().position();
    assert_eq!(u.dimensions(), 3);
    assert!(u.get(1).unwrap().abs() < 1e-9);
    assert!((distance(&e, "u", "w") - 0.5).abs() < 0.01);
}

#[test]
fn missing_files_surface_as_io_errors() {
    let err = Embedding::load("/definitely/not/here.txt", "a", EmbeddingOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

#[test]
fn positions_can_be_saved_and_restored() {
    let records = [
        SimilarityRecord::new("a", "b", 0.5),
        SimilarityRecord::new("b", "c", 0.25),
    ];
    let mut e = Embedding::from_records(&records, "a", one_minus(3)).unwrap();
    let saved = e.clone_positions();
    selkie::relax(&mut e, 30).unwrap();
    assert_ne!(e.clone_positions(), saved);

    e.set_positions(&saved).unwrap();
    assert_eq!(e.clone_positions(), saved);
    for entity in e.entities() {
        assert!(entity.velocity().is_origin());
        assert_eq!(entity.position(), entity.after_position());
    }

    let wrong = vec![Coords::zeros(3); 3];
    assert!(matches!(
        e.set_positions(&wrong),
        Err(Error::DimensionMismatch { .. })
    ));
}
