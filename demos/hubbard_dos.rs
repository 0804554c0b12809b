use ed_physics::prelude::*;
use num_complex::Complex;

fn main() -> Result<(), EdPhysicsError> {
    // Four-site Hubbard ring at half filling.
    let nsite = 4;
    let points = (0..nsite).map(|i| Point::new(i, &[i as f64], 1, 2)).collect();
    let vectors = vec![Coord::from_column_slice(&[nsite as f64])];
    let lattice = Lattice::new("ring4", points, vectors, 1);
    let terms = vec![Term::hopping("t", -1.0, 1), Term::hubbard("U", 4.0).modulated()];

    let config = SimulationConfig::canonical("ring4", 0.5).with_nstep(100);
    let basis = Basis::spin((nsite, nsite / 2), (nsite, nsite / 2))?;
    let mut engine = Onr::new(config, lattice, terms, basis)?;

    println!("# {}", engine.name());
    println!("# gse = {:.12}", engine.ground_state()?.energy);

    println!("E, DOS");
    for (e, rho) in engine.dos(-8.0, 8.0, 161, 0.1)? {
        println!("{e:.4}, {rho:.6e}");
    }

    // Rerun at stronger coupling; only the Hubbard term is regenerated.
    let parameters: Parameters = [("U".to_owned(), Complex::new(8.0, 0.0))].into_iter().collect();
    engine.update(&parameters);
    println!("# {}", engine.name());
    println!("# gse = {:.12}", engine.ground_state()?.energy);
    Ok(())
}
