//! Train a small classifier on synthetic "digits" and inspect predictions.
//!
//! Each class lights up a different block of the 784-pixel input, which makes
//! the problem easy enough to watch the epoch-average loss fall quickly.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use mlp_trainer::{Batches, NetworkBuilder, Trainer};

const INPUT_DIM: usize = 784;
const CLASSES: usize = 10;

fn main() -> mlp_trainer::Result<()> {
    let mut rng = StdRng::seed_from_u64(0);
    let block = INPUT_DIM / CLASSES;

    let samples_per_class = 20;
    let mut inputs = Vec::new();
    let mut labels = Vec::new();
    for class in 0..CLASSES {
        for _ in 0..samples_per_class {
            for pixel in 0..INPUT_DIM {
                let in_block = pixel >= class * block && pixel < (class + 1) * block;
                inputs.push(if in_block {
                    0.8 + rng.gen_range(-0.1..0.1)
                } else {
                    rng.gen_range(0.0..0.1)
                });
            }
            labels.push(class);
        }
    }

    let mut source = Batches::from_flat(inputs.clone(), labels.clone(), INPUT_DIM, 32)?;

    // 784 -> 128 -> 64 -> 10, ReLU hidden layers, raw scores out.
    let network = NetworkBuilder::new(INPUT_DIM)?
        .add_hidden(128)?
        .add_hidden(64)?
        .add_output(CLASSES)?
        .build_with_seed(0)?;
    let mut trainer = Trainer::new(network)?;

    let epoch_losses = trainer.run(&mut source, 5, 0.003)?;
    for (epoch, loss) in epoch_losses.iter().enumerate() {
        println!("epoch {epoch}: avg loss {loss:.4}");
    }

    // Inference on the first sample of each class.
    for class in 0..CLASSES {
        let idx = class * samples_per_class;
        let sample = &inputs[idx * INPUT_DIM..(idx + 1) * INPUT_DIM];
        let probs = trainer.predict(sample, 1)?;

        let (argmax, p) = probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .expect("probabilities are non-empty");
        println!("true class {class}: predicted {argmax} (p = {p:.3})");
    }

    Ok(())
}
