use tracing::warn;

use super::opcode::{AddressingMode, Mnemonic};
use super::{
    Cpu, FLAG_BREAK, FLAG_CARRY, FLAG_DECIMAL, FLAG_INTERRUPT, FLAG_NEGATIVE, FLAG_OVERFLOW,
    FLAG_UNUSED, FLAG_ZERO, IRQ_VECTOR, Instruction,
};

/// Constant ORed into A by the unstable XAA/LXA opcodes
const UNSTABLE_MAGIC: u8 = 0xEE;

impl Cpu {
    /// Apply an instruction's effect
    pub(super) fn execute(&mut self, instruction: &Instruction) {
        match instruction.mnemonic {
            // Loads and stores
            Mnemonic::Lda => {
                self.a = self.operand(instruction);
                self.update_zero_and_negative_flags(self.a);
            }
            Mnemonic::Ldx => {
                self.x = self.operand(instruction);
                self.update_zero_and_negative_flags(self.x);
            }
            Mnemonic::Ldy => {
                self.y = self.operand(instruction);
                self.update_zero_and_negative_flags(self.y);
            }
            Mnemonic::Sta => self.write(instruction.address, self.a),
            Mnemonic::Stx => self.write(instruction.address, self.x),
            Mnemonic::Sty => self.write(instruction.address, self.y),

            // Arithmetic and logic
            Mnemonic::Adc => {
                let value = self.operand(instruction);
                self.adc(value);
            }
            Mnemonic::Sbc => {
                let value = self.operand(instruction);
                self.sbc(value);
            }
            Mnemonic::And => {
                self.a &= self.operand(instruction);
                self.update_zero_and_negative_flags(self.a);
            }
            Mnemonic::Ora => {
                self.a |= self.operand(instruction);
                self.update_zero_and_negative_flags(self.a);
            }
            Mnemonic::Eor => {
                self.a ^= self.operand(instruction);
                self.update_zero_and_negative_flags(self.a);
            }
            Mnemonic::Cmp => {
                let value = self.operand(instruction);
                self.compare(self.a, value);
            }
            Mnemonic::Cpx => {
                let value = self.operand(instruction);
                self.compare(self.x, value);
            }
            Mnemonic::Cpy => {
                let value = self.operand(instruction);
                self.compare(self.y, value);
            }
            Mnemonic::Bit => {
                let value = self.operand(instruction);
                self.set_flag(FLAG_ZERO, self.a & value == 0);
                self.set_flag(FLAG_OVERFLOW, value & 0x40 != 0);
                self.set_flag(FLAG_NEGATIVE, value & 0x80 != 0);
            }

            // Read-modify-write
            Mnemonic::Asl => {
                self.modify(instruction, Cpu::asl);
            }
            Mnemonic::Lsr => {
                self.modify(instruction, Cpu::lsr);
            }
            Mnemonic::Rol => {
                self.modify(instruction, Cpu::rol);
            }
            Mnemonic::Ror => {
                self.modify(instruction, Cpu::ror);
            }
            Mnemonic::Inc => {
                self.modify(instruction, |cpu, value| {
                    let result = value.wrapping_add(1);
                    cpu.update_zero_and_negative_flags(result);
                    result
                });
            }
            Mnemonic::Dec => {
                self.modify(instruction, |cpu, value| {
                    let result = value.wrapping_sub(1);
                    cpu.update_zero_and_negative_flags(result);
                    result
                });
            }

            // Register transfers and counters
            Mnemonic::Tax => {
                self.x = self.a;
                self.update_zero_and_negative_flags(self.x);
            }
            Mnemonic::Tay => {
                self.y = self.a;
                self.update_zero_and_negative_flags(self.y);
            }
            Mnemonic::Txa => {
                self.a = self.x;
                self.update_zero_and_negative_flags(self.a);
            }
            Mnemonic::Tya => {
                self.a = self.y;
                self.update_zero_and_negative_flags(self.a);
            }
            Mnemonic::Tsx => {
                self.x = self.sp;
                self.update_zero_and_negative_flags(self.x);
            }
            Mnemonic::Txs => self.sp = self.x,
            Mnemonic::Inx => {
                self.x = self.x.wrapping_add(1);
                self.update_zero_and_negative_flags(self.x);
            }
            Mnemonic::Iny => {
                self.y = self.y.wrapping_add(1);
                self.update_zero_and_negative_flags(self.y);
            }
            Mnemonic::Dex => {
                self.x = self.x.wrapping_sub(1);
                self.update_zero_and_negative_flags(self.x);
            }
            Mnemonic::Dey => {
                self.y = self.y.wrapping_sub(1);
                self.update_zero_and_negative_flags(self.y);
            }

            // Flags
            Mnemonic::Clc => self.p &= !FLAG_CARRY,
            Mnemonic::Sec => self.p |= FLAG_CARRY,
            Mnemonic::Cli => self.p &= !FLAG_INTERRUPT,
            Mnemonic::Sei => self.p |= FLAG_INTERRUPT,
            Mnemonic::Cld => self.p &= !FLAG_DECIMAL,
            Mnemonic::Sed => self.p |= FLAG_DECIMAL,
            Mnemonic::Clv => self.p &= !FLAG_OVERFLOW,

            // Stack
            Mnemonic::Pha => self.push(self.a),
            Mnemonic::Php => self.push(self.p | FLAG_BREAK | FLAG_UNUSED),
            Mnemonic::Pla => {
                self.a = self.pull();
                self.update_zero_and_negative_flags(self.a);
            }
            Mnemonic::Plp => self.p = self.pulled_status(),

            // Control flow
            Mnemonic::Bcc
            | Mnemonic::Bcs
            | Mnemonic::Beq
            | Mnemonic::Bne
            | Mnemonic::Bmi
            | Mnemonic::Bpl
            | Mnemonic::Bvc
            | Mnemonic::Bvs => {
                if self.branch_taken(instruction.mnemonic) {
                    self.pc = instruction.address;
                }
            }
            Mnemonic::Jmp => self.pc = instruction.address,
            Mnemonic::Jsr => {
                self.push_u16(self.pc.wrapping_sub(1));
                self.pc = instruction.address;
            }
            Mnemonic::Rts => self.pc = self.pull_u16().wrapping_add(1),
            Mnemonic::Rti => {
                self.p = self.pulled_status();
                self.pc = self.pull_u16();
            }
            Mnemonic::Brk => {
                // Skip the padding byte
                self.pc = self.pc.wrapping_add(1);
                self.enter_interrupt(IRQ_VECTOR, true);
            }
            Mnemonic::Nop => {
                // Memory forms still perform the read
                if !matches!(
                    instruction.mode,
                    AddressingMode::Implicit | AddressingMode::Immediate
                ) {
                    self.read(instruction.address);
                }
            }
            Mnemonic::Jam => {
                warn!(
                    opcode = %format!("{:02X}", instruction.opcode),
                    pc = %format!("{:04X}", self.pc.wrapping_sub(1)),
                    "CPU jammed"
                );
                self.halted = true;
            }

            // Unofficial combined operations
            Mnemonic::Slo => {
                let value = self.modify(instruction, Cpu::asl);
                self.a |= value;
                self.update_zero_and_negative_flags(self.a);
            }
            Mnemonic::Rla => {
                let value = self.modify(instruction, Cpu::rol);
                self.a &= value;
                self.update_zero_and_negative_flags(self.a);
            }
            Mnemonic::Sre => {
                let value = self.modify(instruction, Cpu::lsr);
                self.a ^= value;
                self.update_zero_and_negative_flags(self.a);
            }
            Mnemonic::Rra => {
                let value = self.modify(instruction, Cpu::ror);
                self.adc(value);
            }
            Mnemonic::Dcp => {
                let value = self.modify(instruction, |_, value| value.wrapping_sub(1));
                self.compare(self.a, value);
            }
            Mnemonic::Isc => {
                let value = self.modify(instruction, |_, value| value.wrapping_add(1));
                self.sbc(value);
            }
            Mnemonic::Lax => {
                let value = self.operand(instruction);
                self.a = value;
                self.x = value;
                self.update_zero_and_negative_flags(value);
            }
            Mnemonic::Sax => self.write(instruction.address, self.a & self.x),
            Mnemonic::Anc => {
                self.a &= self.operand(instruction);
                self.update_zero_and_negative_flags(self.a);
                self.set_flag(FLAG_CARRY, self.a & 0x80 != 0);
            }
            Mnemonic::Alr => {
                let value = self.a & self.operand(instruction);
                self.a = self.lsr(value);
            }
            Mnemonic::Arr => {
                let value = self.a & self.operand(instruction);
                let result = (value >> 1) | ((self.p & FLAG_CARRY) << 7);
                self.a = result;
                self.update_zero_and_negative_flags(result);
                self.set_flag(FLAG_CARRY, result & 0x40 != 0);
                self.set_flag(FLAG_OVERFLOW, ((result >> 6) ^ (result >> 5)) & 1 != 0);
            }
            Mnemonic::Axs => {
                let value = self.operand(instruction);
                let masked = self.a & self.x;
                self.set_flag(FLAG_CARRY, masked >= value);
                self.x = masked.wrapping_sub(value);
                self.update_zero_and_negative_flags(self.x);
            }
            Mnemonic::Xaa => {
                self.a = (self.a | UNSTABLE_MAGIC) & self.x & self.operand(instruction);
                self.update_zero_and_negative_flags(self.a);
            }
            Mnemonic::Lxa => {
                let value = (self.a | UNSTABLE_MAGIC) & self.operand(instruction);
                self.a = value;
                self.x = value;
                self.update_zero_and_negative_flags(value);
            }
            Mnemonic::Las => {
                let value = self.operand(instruction) & self.sp;
                self.a = value;
                self.x = value;
                self.sp = value;
                self.update_zero_and_negative_flags(value);
            }
            Mnemonic::Sha => self.store_and_high(instruction, self.a & self.x),
            Mnemonic::Shx => self.store_and_high(instruction, self.x),
            Mnemonic::Shy => self.store_and_high(instruction, self.y),
            Mnemonic::Tas => {
                self.sp = self.a & self.x;
                self.store_and_high(instruction, self.sp);
            }
        }
    }

    /// Value the instruction operates on
    fn operand(&self, instruction: &Instruction) -> u8 {
        match instruction.mode {
            AddressingMode::Accumulator => self.a,
            AddressingMode::Implicit => {
                unreachable!("{:?} has no operand", instruction.mnemonic)
            }
            _ => self.read(instruction.address),
        }
    }

    /// Read-modify-write on A or memory. Returns the stored value.
    ///
    /// The 6502 writes the unmodified value back before the result; that
    /// dummy write is not reproduced.
    fn modify(&mut self, instruction: &Instruction, op: impl FnOnce(&mut Cpu, u8) -> u8) -> u8 {
        let value = self.operand(instruction);
        let result = op(self, value);
        match instruction.mode {
            AddressingMode::Accumulator => self.a = result,
            _ => self.write(instruction.address, result),
        }
        result
    }

    /// SHA/SHX/SHY/TAS store `value & (H + 1)` where H is the high byte of
    /// the unindexed base. When indexing crossed a page the result also
    /// replaces the high byte of the target address.
    fn store_and_high(&mut self, instruction: &Instruction, value: u8) {
        let high = (instruction.address >> 8) as u8;
        let base_high_plus_one = if instruction.page_crossed {
            high
        } else {
            high.wrapping_add(1)
        };
        let result = value & base_high_plus_one;
        let address = if instruction.page_crossed {
            (u16::from(result) << 8) | (instruction.address & 0x00FF)
        } else {
            instruction.address
        };
        self.write(address, result);
    }

    fn pulled_status(&mut self) -> u8 {
        (self.pull() & !FLAG_BREAK) | FLAG_UNUSED
    }

    fn set_flag(&mut self, flag: u8, on: bool) {
        if on {
            self.p |= flag;
        } else {
            self.p &= !flag;
        }
    }

    fn update_zero_and_negative_flags(&mut self, value: u8) {
        self.set_flag(FLAG_ZERO, value == 0);
        self.set_flag(FLAG_NEGATIVE, value & 0x80 != 0);
    }

    fn adc(&mut self, value: u8) {
        let carry = u16::from(self.p & FLAG_CARRY);
        let sum = u16::from(self.a) + u16::from(value) + carry;
        let result = sum as u8;
        self.set_flag(FLAG_CARRY, sum > 0xFF);
        // Signed overflow: both inputs share a sign the result does not
        self.set_flag(FLAG_OVERFLOW, (self.a ^ result) & (value ^ result) & 0x80 != 0);
        self.a = result;
        self.update_zero_and_negative_flags(result);
    }

    /// A - M - (1 - C) == A + !M + C
    fn sbc(&mut self, value: u8) {
        self.adc(!value);
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.set_flag(FLAG_CARRY, register >= value);
        self.update_zero_and_negative_flags(register.wrapping_sub(value));
    }

    fn asl(&mut self, value: u8) -> u8 {
        self.set_flag(FLAG_CARRY, value & 0x80 != 0);
        let result = value << 1;
        self.update_zero_and_negative_flags(result);
        result
    }

    fn lsr(&mut self, value: u8) -> u8 {
        self.set_flag(FLAG_CARRY, value & 0x01 != 0);
        let result = value >> 1;
        self.update_zero_and_negative_flags(result);
        result
    }

    fn rol(&mut self, value: u8) -> u8 {
        let carry_in = self.p & FLAG_CARRY;
        self.set_flag(FLAG_CARRY, value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        self.update_zero_and_negative_flags(result);
        result
    }

    fn ror(&mut self, value: u8) -> u8 {
        let carry_in = (self.p & FLAG_CARRY) << 7;
        self.set_flag(FLAG_CARRY, value & 0x01 != 0);
        let result = (value >> 1) | carry_in;
        self.update_zero_and_negative_flags(result);
        result
    }
}
