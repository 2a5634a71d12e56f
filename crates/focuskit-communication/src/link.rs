//! Collaborator seams for the motion controller and the scan program player
//!
//! The runtime executes automator effects through these traits. The logging
//! implementations stand in for real hardware when replaying a session.

use focuskit_automation::count_pauses;
use tracing::info;

use crate::error::{LinkError, LinkResult};

/// Line-oriented link to the motion controller
pub trait MotionLink: Send {
    /// Send a command line
    fn send(&mut self, line: &str) -> LinkResult<()>;

    /// Send a command line the controller must acknowledge
    ///
    /// The acknowledgment arrives later as a `MotionEvent::Acknowledged`.
    fn send_with_answer(&mut self, line: &str) -> LinkResult<()>;

    /// Set the laser power output
    fn set_laser_power(&mut self, power: f32) -> LinkResult<()>;
}

/// Player for scan programs
pub trait ScanProgramPlayer: Send {
    /// Load and start a program
    fn start(&mut self, program: &str) -> LinkResult<()>;

    /// Resume after a pause marker
    fn resume(&mut self) -> LinkResult<()>;

    /// Stop the running program
    fn stop(&mut self) -> LinkResult<()>;
}

/// Motion link that only logs what it is asked to send
#[derive(Debug, Default)]
pub struct LoggingMotionLink {
    connected: bool,
    sent: usize,
}

impl LoggingMotionLink {
    /// Create a connected logging link
    pub fn new() -> Self {
        Self {
            connected: true,
            sent: 0,
        }
    }

    /// Simulate the link going up or down
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Lines sent so far
    pub fn sent(&self) -> usize {
        self.sent
    }

    fn check(&self) -> LinkResult<()> {
        if self.connected {
            Ok(())
        } else {
            Err(LinkError::NotConnected)
        }
    }
}

impl MotionLink for LoggingMotionLink {
    fn send(&mut self, line: &str) -> LinkResult<()> {
        self.check()?;
        self.sent += 1;
        info!("MC <- {}", line.trim_end());
        Ok(())
    }

    fn send_with_answer(&mut self, line: &str) -> LinkResult<()> {
        self.check()?;
        self.sent += 1;
        info!("MC <- {} (answer required)", line.trim_end());
        Ok(())
    }

    fn set_laser_power(&mut self, power: f32) -> LinkResult<()> {
        self.check()?;
        info!("Laser power <- {:.3}", power);
        Ok(())
    }
}

/// Scan player that only logs program control
#[derive(Debug, Default)]
pub struct LoggingPlayer {
    running: bool,
    samples: usize,
    resumed: usize,
}

impl LoggingPlayer {
    /// Create an idle logging player
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a program is loaded and running
    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl ScanProgramPlayer for LoggingPlayer {
    fn start(&mut self, program: &str) -> LinkResult<()> {
        if self.running {
            return Err(LinkError::Player("a program is already running".to_string()));
        }
        self.running = true;
        self.samples = count_pauses(program);
        self.resumed = 0;
        info!(
            "Player started: {} lines, {} samples",
            program.lines().count(),
            self.samples
        );
        Ok(())
    }

    fn resume(&mut self) -> LinkResult<()> {
        if !self.running {
            return Err(LinkError::Player("no program running".to_string()));
        }
        self.resumed += 1;
        info!("Player resumed ({}/{})", self.resumed, self.samples);
        Ok(())
    }

    fn stop(&mut self) -> LinkResult<()> {
        if self.running {
            info!("Player stopped");
        }
        self.running = false;
        Ok(())
    }
}
