use log::{debug, info};

pub trait ProgressCallback: Send {
    fn on_generation_start(&mut self, generation: u32, population: usize);
    fn on_candidate_evaluated(&mut self, evaluated: usize, total: usize);
    fn on_generation_complete(&mut self, generation: u32, best_fitness: f64, survivors: usize);
}

pub struct LogProgressCallback;

impl ProgressCallback for LogProgressCallback {
    fn on_generation_start(&mut self, generation: u32, population: usize) {
        info!("Generation {} starting with {} candidates", generation, population);
    }

    fn on_candidate_evaluated(&mut self, evaluated: usize, total: usize) {
        if evaluated % 10 == 0 || evaluated == total {
            debug!("  Evaluated {}/{} candidates", evaluated, total);
        }
    }

    fn on_generation_complete(&mut self, generation: u32, best_fitness: f64, survivors: usize) {
        info!(
            "Generation {} complete. Best fitness: {:.2}, survivors: {}",
            generation, best_fitness, survivors
        );
    }
}

// For hosts that watch the batch job from another thread
pub struct ChannelProgressCallback {
    sender: std::sync::mpsc::Sender<ProgressMessage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressMessage {
    GenerationStart { generation: u32, population: usize },
    CandidateEvaluated { evaluated: usize, total: usize },
    GenerationComplete { generation: u32, best_fitness: f64, survivors: usize },
}

impl ChannelProgressCallback {
    pub fn new(sender: std::sync::mpsc::Sender<ProgressMessage>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_generation_start(&mut self, generation: u32, population: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationStart {
            generation,
            population,
        });
    }

    fn on_candidate_evaluated(&mut self, evaluated: usize, total: usize) {
        let _ = self
            .sender
            .send(ProgressMessage::CandidateEvaluated { evaluated, total });
    }

    fn on_generation_complete(&mut self, generation: u32, best_fitness: f64, survivors: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationComplete {
            generation,
            best_fitness,
            survivors,
        });
    }
}
