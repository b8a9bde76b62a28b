use crate::memory::Centroids;

/// Phase of a fit.
/// `Converged` and `MaxStepsReached` are both terminal and both valid outcomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FitStatus {
    /// Initial centroids are being chosen (on the root) and distributed.
    Seeding,
    /// Generations are running.
    Iterating,
    /// The last update reproduced the centroids byte for byte.
    Converged,
    /// The generation limit was hit before the centroids stabilized.
    MaxStepsReached,
}
impl FitStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, FitStatus::Converged | FitStatus::MaxStepsReached)
    }
}

/// Drives the iterate-until-stable loop.
///
/// Every worker runs its own controller. Since all workers see the same broadcast
/// centroids, all controllers take the same decisions in the same generation.
pub(crate) struct ConvergenceController {
    max_iter: usize,
    generations: usize,
    prior: Option<Centroids>,
    status: FitStatus,
}
impl ConvergenceController {
    pub(crate) fn new(max_iter: usize) -> Self {
        Self { max_iter, generations: 0, prior: None, status: FitStatus::Seeding }
    }

    /// Seeding finished, the first generation may start.
    pub(crate) fn seeded(&mut self) {
        debug_assert_eq!(self.status, FitStatus::Seeding);
        self.status = FitStatus::Iterating;
    }

    /// Function that has to be called before each generation with the centroids that
    /// generation starts from.
    /// ## Returns
    /// - **true** if another generation should run
    /// - **false** if the loop is done, the status is then terminal
    pub(crate) fn next(&mut self, current: &Centroids) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        if self.prior.as_ref() == Some(current) {
            self.status = FitStatus::Converged;
            return false;
        }
        if self.generations >= self.max_iter {
            self.status = FitStatus::MaxStepsReached;
            return false;
        }
        self.generations += 1;
        self.prior = Some(current.clone());
        true
    }

    pub(crate) fn generations(&self) -> usize { self.generations }
    pub(crate) fn status(&self) -> FitStatus { self.status }
}


#[cfg(test)]
mod tests {
	use super::*;

	fn c(bytes: &[u8]) -> Centroids {
		Centroids::from_vec(bytes.to_vec(), bytes.len(), 1).unwrap()
	}

	#[test]
	fn converges_on_equal_centroids() {
		let mut controller = ConvergenceController::new(300);
		assert_eq!(controller.status(), FitStatus::Seeding);
		controller.seeded();
		assert!(controller.next(&c(&[0, 5])));
		assert!(controller.next(&c(&[0, 7])));
		assert!(!controller.next(&c(&[0, 7])));
		assert_eq!(controller.status(), FitStatus::Converged);
		assert_eq!(controller.generations(), 2);
		// terminal states stay terminal
		assert!(!controller.next(&c(&[1, 1])));
		assert_eq!(controller.status(), FitStatus::Converged);
	}

	#[test]
	fn stops_at_generation_limit() {
		let mut controller = ConvergenceController::new(3);
		controller.seeded();
		assert!(controller.next(&c(&[0])));
		assert!(controller.next(&c(&[1])));
		assert!(controller.next(&c(&[0])));
		assert!(!controller.next(&c(&[1])));
		assert_eq!(controller.status(), FitStatus::MaxStepsReached);
		assert_eq!(controller.generations(), 3);
	}

	#[test]
	fn equality_wins_over_limit() {
		let mut controller = ConvergenceController::new(1);
		controller.seeded();
		assert!(controller.next(&c(&[4])));
		assert!(!controller.next(&c(&[4])));
		assert_eq!(controller.status(), FitStatus::Converged);
	}

	#[test]
	fn zero_generations() {
		let mut controller = ConvergenceController::new(0);
		controller.seeded();
		assert!(!controller.next(&c(&[4])));
		assert_eq!(controller.status(), FitStatus::MaxStepsReached);
		assert_eq!(controller.generations(), 0);
	}
}
