use std::cell::Cell;
use std::rc::Rc;

/// The CPU's /NMI and /IRQ inputs.
///
/// Cloned into the PPU and APU so they can raise interrupts without holding a
/// reference to the CPU. Requests only latch; the CPU samples and clears them
/// between instructions.
#[derive(Debug, Clone, Default)]
pub struct InterruptLines {
    nmi: Rc<Cell<bool>>,
    irq: Rc<Cell<bool>>,
}

impl InterruptLines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_nmi(&self) {
        self.nmi.set(true);
    }

    pub fn request_irq(&self) {
        self.irq.set(true);
    }

    pub fn nmi_pending(&self) -> bool {
        self.nmi.get()
    }

    pub fn irq_pending(&self) -> bool {
        self.irq.get()
    }

    /// Acknowledge a delivered NMI. A pending IRQ is dropped with it.
    pub(crate) fn acknowledge_nmi(&self) {
        self.nmi.set(false);
        self.irq.set(false);
    }

    pub(crate) fn acknowledge_irq(&self) {
        self.irq.set(false);
    }

    pub fn clear(&self) {
        self.nmi.set(false);
        self.irq.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let cpu_side = InterruptLines::new();
        let ppu_side = cpu_side.clone();
        ppu_side.request_nmi();
        assert!(cpu_side.nmi_pending());
        assert!(!cpu_side.irq_pending());
    }

    #[test]
    fn test_nmi_acknowledge_drops_irq() {
        let lines = InterruptLines::new();
        lines.request_irq();
        lines.request_nmi();
        lines.acknowledge_nmi();
        assert!(!lines.nmi_pending());
        assert!(!lines.irq_pending());
    }

    #[test]
    fn test_irq_stays_latched_until_acknowledged() {
        let lines = InterruptLines::new();
        lines.request_irq();
        assert!(lines.irq_pending());
        assert!(lines.irq_pending());
        lines.acknowledge_irq();
        assert!(!lines.irq_pending());
    }
}
