use approx::assert_relative_eq;
use ed_physics::math::to_dense;
use ed_physics::onr::hamiltonian;
use ed_physics::prelude::*;
use num_complex::Complex;
use proptest::prelude::*;

fn chain(n: usize, nspin: usize) -> Lattice {
    let points = (0..n).map(|i| Point::new(i, &[i as Scalar], 1, nspin)).collect();
    Lattice::new("chain", points, Vec::new(), 1)
}

fn generator(t: Scalar, mu: Scalar, u: Scalar) -> Generator {
    let lattice = chain(3, 2);
    let terms = vec![
        Term::hopping("t", t, 1),
        Term::onsite("mu", mu).modulated(),
        Term::hubbard("U", u).modulated(),
    ];
    Generator::new(lattice.bonds().to_vec(), lattice.table(false), terms, false, true).expect("valid model")
}

fn params(pairs: &[(&str, Scalar)]) -> Parameters {
    pairs.iter().map(|(k, v)| ((*k).to_owned(), Complex::new(*v, 0.0))).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn unknown_parameters_leave_operators_unchanged(value in -10.0f64..10.0, name in "[a-z]{2,6}") {
        prop_assume!(name != "mu");
        let mut generator = generator(-1.0, -0.5, 4.0);
        let before = generator.operators();
        generator.update(&params(&[(name.as_str(), value)]));
        prop_assert_eq!(generator.operators(), before);
    }

    #[test]
    fn updates_are_path_independent(u1 in 0.0f64..8.0, u2 in 0.0f64..8.0, mu in -2.0f64..2.0) {
        let mut stepped = generator(-1.0, -0.5, 4.0);
        stepped.update(&params(&[("U", u1)]));
        stepped.update(&params(&[("mu", mu)]));
        stepped.update(&params(&[("U", u2)]));

        let mut direct = generator(-1.0, -0.5, 4.0);
        direct.update(&params(&[("U", u2), ("mu", mu)]));

        let a = stepped.operators();
        let b = direct.operators();
        prop_assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            prop_assert!(x.cmp_id(y).is_eq());
            prop_assert!((x.value - y.value).norm() < 1.0e-12);
        }
    }

    #[test]
    fn merged_list_length_is_stable(u in 0.1f64..8.0, mu in -2.0f64..2.0) {
        let mut generator = generator(-1.0, -0.5, 4.0);
        let before = generator.operators().len();
        generator.update(&params(&[("U", u), ("mu", mu)]));
        let cache = generator.cache();
        let alter: usize = cache.alter().iter().map(|e| e.operators().len()).sum();
        prop_assert_eq!(generator.operators().len(), before);
        prop_assert_eq!(cache.constant().len() + alter, before);
    }

    #[test]
    fn assembled_hamiltonian_is_hermitian(
        t in -2.0f64..2.0,
        mu in -2.0f64..2.0,
        u in 0.0f64..8.0,
        nup in 0usize..=3,
    ) {
        let generator = generator(t, mu, u);
        let basis = Basis::spin((3, nup), (3, 1)).expect("valid basis");
        let dense = to_dense(&hamiltonian(basis, generator.iter_operators()));
        let adjoint = dense.adjoint();
        for (x, y) in dense.iter().zip(adjoint.iter()) {
            prop_assert!((x - y).norm() < 1.0e-12);
        }
    }
}

#[test]
fn lanczos_ground_energy_matches_dense_minimum() {
    let generator = generator(-1.0, -0.3, 3.0);
    let basis = Basis::spin((3, 2), (3, 1)).expect("valid basis");
    let matrix = hamiltonian(basis, generator.iter_operators());
    let minimum = to_dense(&matrix)
        .symmetric_eigenvalues()
        .iter()
        .copied()
        .fold(Scalar::INFINITY, Scalar::min);

    let mut lanczos = Lanczos::with_default_seed(&matrix).expect("square");
    let pair = lanczos.eig(Job::Value).expect("eigenpair");
    assert_relative_eq!(pair.value, minimum, epsilon = 1.0e-9);
}
