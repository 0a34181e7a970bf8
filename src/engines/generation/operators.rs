use crate::engines::generation::genome::{
    genome_id, normalize_row, Genome, TransitionMatrix, TERMINAL_ROW,
};
use crate::engines::generation::stage::STAGE_COUNT;
use rand::Rng;

/// Generate random genome: uniform cells, each non-terminal row normalized.
pub fn random_genome<R: Rng + ?Sized>(generation: u32, rng: &mut R) -> Genome {
    let mut matrix: TransitionMatrix = [[0.0; STAGE_COUNT]; STAGE_COUNT];

    for row in matrix.iter_mut().take(TERMINAL_ROW) {
        for cell in row.iter_mut() {
            *cell = rng.gen::<f64>();
        }
        normalize_row(row);
    }

    Genome::new(genome_id(rng), generation, matrix)
}

/// Elementwise average of both parents' matrices.
pub fn crossover<R: Rng + ?Sized>(parent1: &Genome, parent2: &Genome, rng: &mut R) -> Genome {
    let mut matrix: TransitionMatrix = [[0.0; STAGE_COUNT]; STAGE_COUNT];

    for (i, row) in matrix.iter_mut().enumerate().take(TERMINAL_ROW) {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (parent1.matrix[i][j] + parent2.matrix[i][j]) / 2.0;
        }
        normalize_row(row);
    }

    Genome::new(
        genome_id(rng),
        parent1.generation.max(parent2.generation) + 1,
        matrix,
    )
}

/// Point mutation: rewrite one cell of one non-terminal row, renormalize that row.
///
/// Returns the `(row, column)` that was rewritten.
pub fn mutate<R: Rng + ?Sized>(genome: &mut Genome, rng: &mut R) -> (usize, usize) {
    let row = rng.gen_range(0..TERMINAL_ROW);
    let col = rng.gen_range(0..STAGE_COUNT);

    genome.matrix[row][col] = rng.gen::<f64>();
    normalize_row(&mut genome.matrix[row]);
    genome.fitness = None;
    genome.phenotype = None;

    (row, col)
}

/// Mutate with probability `mutation_rate`; returns whether a mutation happened.
pub fn maybe_mutate<R: Rng + ?Sized>(genome: &mut Genome, mutation_rate: f64, rng: &mut R) -> bool {
    if rng.gen::<f64>() < mutation_rate {
        mutate(genome, rng);
        true
    } else {
        false
    }
}

/// Uniform pick (with replacement) among survivors.
pub fn uniform_selection<'a, R: Rng + ?Sized>(survivors: &'a [Genome], rng: &mut R) -> &'a Genome {
    &survivors[rng.gen_range(0..survivors.len())]
}
