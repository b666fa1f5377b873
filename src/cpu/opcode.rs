//! Opcode decode tables for the 2A03's 6502 core.
//!
//! Every opcode byte is `aaabbbcc`: `cc` is the instruction group, `bbb` the
//! addressing-mode code and `aaa` the instruction code within the group.

/// The 13 6502 addressing modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Implicit,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Relative,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    /// (zp,X)
    IndirectX,
    /// (zp),Y
    IndirectY,
}

impl AddressingMode {
    /// Operand bytes following the opcode
    pub fn operand_len(self) -> u16 {
        match self {
            AddressingMode::Implicit | AddressingMode::Accumulator => 0,
            AddressingMode::Immediate
            | AddressingMode::ZeroPage
            | AddressingMode::ZeroPageX
            | AddressingMode::ZeroPageY
            | AddressingMode::Relative
            | AddressingMode::IndirectX
            | AddressingMode::IndirectY => 1,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 2,
        }
    }
}

/// Split an opcode into (group `cc`, mode code `bbb`, instruction code `aaa`)
pub const fn split(opcode: u8) -> (u8, u8, u8) {
    (opcode & 0x03, (opcode >> 2) & 0x07, opcode >> 5)
}

/// Map (group, addressing-mode code, instruction code) to an addressing mode.
///
/// Total: inputs are masked to their field widths, so every combination yields
/// a mode. Unused encodings (the JAM column) decode as implicit.
pub fn decode_addressing_mode(group: u8, mode_code: u8, instruction_code: u8) -> AddressingMode {
    use AddressingMode::*;

    let group = group & 0x03;
    let mode_code = mode_code & 0x07;
    let instruction_code = instruction_code & 0x07;
    // LDX/STX/SAX/LAX and friends index with Y instead of X
    let uses_y = matches!(instruction_code, 4 | 5);

    match group {
        0b00 => match mode_code {
            0 => match instruction_code {
                1 => Absolute, // JSR
                0 | 2 | 3 => Implicit, // BRK, RTI, RTS
                _ => Immediate,
            },
            1 => ZeroPage,
            2 => Implicit,
            3 if instruction_code == 3 => Indirect, // JMP ($nnnn)
            3 => Absolute,
            4 => Relative,
            5 => ZeroPageX,
            6 => Implicit,
            _ => AbsoluteX,
        },
        0b10 => match mode_code {
            0 if instruction_code < 4 => Implicit, // JAM
            0 => Immediate,
            1 => ZeroPage,
            2 if instruction_code < 4 => Accumulator,
            2 => Implicit,
            3 => Absolute,
            4 => Implicit, // JAM
            5 if uses_y => ZeroPageY,
            5 => ZeroPageX,
            6 => Implicit,
            _ if uses_y => AbsoluteY,
            _ => AbsoluteX,
        },
        // 0b01 and 0b11 share the ALU layout; 0b11 swaps in Y for aaa 4/5
        _ => match mode_code {
            0 => IndirectX,
            1 => ZeroPage,
            2 => Immediate,
            3 => Absolute,
            4 => IndirectY,
            5 if group == 0b11 && uses_y => ZeroPageY,
            5 => ZeroPageX,
            6 => AbsoluteY,
            _ if group == 0b11 && uses_y => AbsoluteY,
            _ => AbsoluteX,
        },
    }
}

/// Addressing mode of an opcode byte
pub fn addressing_mode(opcode: u8) -> AddressingMode {
    let (group, mode_code, instruction_code) = split(opcode);
    decode_addressing_mode(group, mode_code, instruction_code)
}

/// Instruction mnemonics, official and unofficial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
    // Unofficial
    Alr, Anc, Arr, Axs, Dcp, Isc, Jam, Las, Lax, Lxa, Rla, Rra, Sax, Sha,
    Shx, Shy, Slo, Sre, Tas, Xaa,
}

impl Mnemonic {
    pub fn name(self) -> &'static str {
        use Mnemonic::*;
        match self {
            Adc => "ADC", And => "AND", Asl => "ASL", Bcc => "BCC", Bcs => "BCS",
            Beq => "BEQ", Bit => "BIT", Bmi => "BMI", Bne => "BNE", Bpl => "BPL",
            Brk => "BRK", Bvc => "BVC", Bvs => "BVS", Clc => "CLC", Cld => "CLD",
            Cli => "CLI", Clv => "CLV", Cmp => "CMP", Cpx => "CPX", Cpy => "CPY",
            Dec => "DEC", Dex => "DEX", Dey => "DEY", Eor => "EOR", Inc => "INC",
            Inx => "INX", Iny => "INY", Jmp => "JMP", Jsr => "JSR", Lda => "LDA",
            Ldx => "LDX", Ldy => "LDY", Lsr => "LSR", Nop => "NOP", Ora => "ORA",
            Pha => "PHA", Php => "PHP", Pla => "PLA", Plp => "PLP", Rol => "ROL",
            Ror => "ROR", Rti => "RTI", Rts => "RTS", Sbc => "SBC", Sec => "SEC",
            Sed => "SED", Sei => "SEI", Sta => "STA", Stx => "STX", Sty => "STY",
            Tax => "TAX", Tay => "TAY", Tsx => "TSX", Txa => "TXA", Txs => "TXS",
            Tya => "TYA", Alr => "ALR", Anc => "ANC", Arr => "ARR", Axs => "AXS",
            Dcp => "DCP", Isc => "ISB", Jam => "JAM", Las => "LAS", Lax => "LAX",
            Lxa => "LXA", Rla => "RLA", Rra => "RRA", Sax => "SAX", Sha => "SHA",
            Shx => "SHX", Shy => "SHY", Slo => "SLO", Sre => "SRE", Tas => "TAS",
            Xaa => "XAA",
        }
    }

    /// Conditional branch instructions
    pub fn is_branch(self) -> bool {
        use Mnemonic::*;
        matches!(self, Bcc | Bcs | Beq | Bmi | Bne | Bpl | Bvc | Bvs)
    }
}

use Mnemonic as M;

/// Mnemonic per opcode, row = high nibble
#[rustfmt::skip]
pub const MNEMONICS: [Mnemonic; 256] = [
    // 0x00
    M::Brk, M::Ora, M::Jam, M::Slo, M::Nop, M::Ora, M::Asl, M::Slo,
    M::Php, M::Ora, M::Asl, M::Anc, M::Nop, M::Ora, M::Asl, M::Slo,
    // 0x10
    M::Bpl, M::Ora, M::Jam, M::Slo, M::Nop, M::Ora, M::Asl, M::Slo,
    M::Clc, M::Ora, M::Nop, M::Slo, M::Nop, M::Ora, M::Asl, M::Slo,
    // 0x20
    M::Jsr, M::And, M::Jam, M::Rla, M::Bit, M::And, M::Rol, M::Rla,
    M::Plp, M::And, M::Rol, M::Anc, M::Bit, M::And, M::Rol, M::Rla,
    // 0x30
    M::Bmi, M::And, M::Jam, M::Rla, M::Nop, M::And, M::Rol, M::Rla,
    M::Sec, M::And, M::Nop, M::Rla, M::Nop, M::And, M::Rol, M::Rla,
    // 0x40
    M::Rti, M::Eor, M::Jam, M::Sre, M::Nop, M::Eor, M::Lsr, M::Sre,
    M::Pha, M::Eor, M::Lsr, M::Alr, M::Jmp, M::Eor, M::Lsr, M::Sre,
    // 0x50
    M::Bvc, M::Eor, M::Jam, M::Sre, M::Nop, M::Eor, M::Lsr, M::Sre,
    M::Cli, M::Eor, M::Nop, M::Sre, M::Nop, M::Eor, M::Lsr, M::Sre,
    // 0x60
    M::Rts, M::Adc, M::Jam, M::Rra, M::Nop, M::Adc, M::Ror, M::Rra,
    M::Pla, M::Adc, M::Ror, M::Arr, M::Jmp, M::Adc, M::Ror, M::Rra,
    // 0x70
    M::Bvs, M::Adc, M::Jam, M::Rra, M::Nop, M::Adc, M::Ror, M::Rra,
    M::Sei, M::Adc, M::Nop, M::Rra, M::Nop, M::Adc, M::Ror, M::Rra,
    // 0x80
    M::Nop, M::Sta, M::Nop, M::Sax, M::Sty, M::Sta, M::Stx, M::Sax,
    M::Dey, M::Nop, M::Txa, M::Xaa, M::Sty, M::Sta, M::Stx, M::Sax,
    // 0x90
    M::Bcc, M::Sta, M::Jam, M::Sha, M::Sty, M::Sta, M::Stx, M::Sax,
    M::Tya, M::Sta, M::Txs, M::Tas, M::Shy, M::Sta, M::Shx, M::Sha,
    // 0xA0
    M::Ldy, M::Lda, M::Ldx, M::Lax, M::Ldy, M::Lda, M::Ldx, M::Lax,
    M::Tay, M::Lda, M::Tax, M::Lxa, M::Ldy, M::Lda, M::Ldx, M::Lax,
    // 0xB0
    M::Bcs, M::Lda, M::Jam, M::Lax, M::Ldy, M::Lda, M::Ldx, M::Lax,
    M::Clv, M::Lda, M::Tsx, M::Las, M::Ldy, M::Lda, M::Ldx, M::Lax,
    // 0xC0
    M::Cpy, M::Cmp, M::Nop, M::Dcp, M::Cpy, M::Cmp, M::Dec, M::Dcp,
    M::Iny, M::Cmp, M::Dex, M::Axs, M::Cpy, M::Cmp, M::Dec, M::Dcp,
    // 0xD0
    M::Bne, M::Cmp, M::Jam, M::Dcp, M::Nop, M::Cmp, M::Dec, M::Dcp,
    M::Cld, M::Cmp, M::Nop, M::Dcp, M::Nop, M::Cmp, M::Dec, M::Dcp,
    // 0xE0
    M::Cpx, M::Sbc, M::Nop, M::Isc, M::Cpx, M::Sbc, M::Inc, M::Isc,
    M::Inx, M::Sbc, M::Nop, M::Sbc, M::Cpx, M::Sbc, M::Inc, M::Isc,
    // 0xF0
    M::Beq, M::Sbc, M::Jam, M::Isc, M::Nop, M::Sbc, M::Inc, M::Isc,
    M::Sed, M::Sbc, M::Nop, M::Isc, M::Nop, M::Sbc, M::Inc, M::Isc,
];

/// Base cycle count per opcode
#[rustfmt::skip]
pub const CYCLES: [u8; 256] = [
    7, 6, 2, 8, 3, 3, 5, 5, 3, 2, 2, 2, 4, 4, 6, 6, // 0x00
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 0x10
    6, 6, 2, 8, 3, 3, 5, 5, 4, 2, 2, 2, 4, 4, 6, 6, // 0x20
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 0x30
    6, 6, 2, 8, 3, 3, 5, 5, 3, 2, 2, 2, 3, 4, 6, 6, // 0x40
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 0x50
    6, 6, 2, 8, 3, 3, 5, 5, 4, 2, 2, 2, 5, 4, 6, 6, // 0x60
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 0x70
    2, 6, 2, 6, 3, 3, 3, 3, 2, 2, 2, 2, 4, 4, 4, 4, // 0x80
    2, 6, 2, 6, 4, 4, 4, 4, 2, 5, 2, 5, 5, 5, 5, 5, // 0x90
    2, 6, 2, 6, 3, 3, 3, 3, 2, 2, 2, 2, 4, 4, 4, 4, // 0xA0
    2, 5, 2, 5, 4, 4, 4, 4, 2, 4, 2, 4, 4, 4, 4, 4, // 0xB0
    2, 6, 2, 8, 3, 3, 5, 5, 2, 2, 2, 2, 4, 4, 6, 6, // 0xC0
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 0xD0
    2, 6, 2, 8, 3, 3, 5, 5, 2, 2, 2, 2, 4, 4, 6, 6, // 0xE0
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 0xF0
];

/// Opcodes that take one extra cycle when indexing crosses a page.
/// Stores and read-modify-write forms always pay for the fix-up cycle in
/// their base count instead.
#[rustfmt::skip]
pub const PAGE_CROSS_PENALTY: [bool; 256] = {
    let mut table = [false; 256];
    let mut row = 0;
    while row < 16 {
        // Odd rows hold the (zp),Y / abs,Y / abs,X forms
        if row % 2 == 1 && row != 0x9 && row != 0xB {
            let base = row * 16;
            table[base + 0x1] = true;
            table[base + 0x9] = true;
            table[base + 0xC] = true;
            table[base + 0xD] = true;
        }
        row += 1;
    }
    // LDA/LDX/LDY/LAX/LAS row follows its own pattern
    table[0xB1] = true;
    table[0xB3] = true;
    table[0xB9] = true;
    table[0xBB] = true;
    table[0xBC] = true;
    table[0xBD] = true;
    table[0xBE] = true;
    table[0xBF] = true;
    table
};

/// Whether an opcode is part of the documented instruction set
pub fn is_official(opcode: u8) -> bool {
    let mnemonic = MNEMONICS[opcode as usize];
    let (group, mode_code, _) = split(opcode);
    match mnemonic {
        Mnemonic::Jam
        | Mnemonic::Slo
        | Mnemonic::Rla
        | Mnemonic::Sre
        | Mnemonic::Rra
        | Mnemonic::Sax
        | Mnemonic::Lax
        | Mnemonic::Dcp
        | Mnemonic::Isc
        | Mnemonic::Anc
        | Mnemonic::Alr
        | Mnemonic::Arr
        | Mnemonic::Xaa
        | Mnemonic::Lxa
        | Mnemonic::Axs
        | Mnemonic::Las
        | Mnemonic::Sha
        | Mnemonic::Shx
        | Mnemonic::Shy
        | Mnemonic::Tas => false,
        Mnemonic::Nop => opcode == 0xEA,
        // $EB duplicates $E9
        Mnemonic::Sbc => !(group == 0b11 && mode_code == 2),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AddressingMode::*;

    /// Reference matrix, written out row by row from the 6502 opcode chart
    #[rustfmt::skip]
    const MODES: [AddressingMode; 256] = [
        Implicit, IndirectX, Implicit, IndirectX, ZeroPage, ZeroPage, ZeroPage, ZeroPage,
        Implicit, Immediate, Accumulator, Immediate, Absolute, Absolute, Absolute, Absolute,
        Relative, IndirectY, Implicit, IndirectY, ZeroPageX, ZeroPageX, ZeroPageX, ZeroPageX,
        Implicit, AbsoluteY, Implicit, AbsoluteY, AbsoluteX, AbsoluteX, AbsoluteX, AbsoluteX,
        Absolute, IndirectX, Implicit, IndirectX, ZeroPage, ZeroPage, ZeroPage, ZeroPage,
        Implicit, Immediate, Accumulator, Immediate, Absolute, Absolute, Absolute, Absolute,
        Relative, IndirectY, Implicit, IndirectY, ZeroPageX, ZeroPageX, ZeroPageX, ZeroPageX,
        Implicit, AbsoluteY, Implicit, AbsoluteY, AbsoluteX, AbsoluteX, AbsoluteX, AbsoluteX,
        Implicit, IndirectX, Implicit, IndirectX, ZeroPage, ZeroPage, ZeroPage, ZeroPage,
        Implicit, Immediate, Accumulator, Immediate, Absolute, Absolute, Absolute, Absolute,
        Relative, IndirectY, Implicit, IndirectY, ZeroPageX, ZeroPageX, ZeroPageX, ZeroPageX,
        Implicit, AbsoluteY, Implicit, AbsoluteY, AbsoluteX, AbsoluteX, AbsoluteX, AbsoluteX,
        Implicit, IndirectX, Implicit, IndirectX, ZeroPage, ZeroPage, ZeroPage, ZeroPage,
        Implicit, Immediate, Accumulator, Immediate, Indirect, Absolute, Absolute, Absolute,
        Relative, IndirectY, Implicit, IndirectY, ZeroPageX, ZeroPageX, ZeroPageX, ZeroPageX,
        Implicit, AbsoluteY, Implicit, AbsoluteY, AbsoluteX, AbsoluteX, AbsoluteX, AbsoluteX,
        Immediate, IndirectX, Immediate, IndirectX, ZeroPage, ZeroPage, ZeroPage, ZeroPage,
        Implicit, Immediate, Implicit, Immediate, Absolute, Absolute, Absolute, Absolute,
        Relative, IndirectY, Implicit, IndirectY, ZeroPageX, ZeroPageX, ZeroPageY, ZeroPageY,
        Implicit, AbsoluteY, Implicit, AbsoluteY, AbsoluteX, AbsoluteX, AbsoluteY, AbsoluteY,
        Immediate, IndirectX, Immediate, IndirectX, ZeroPage, ZeroPage, ZeroPage, ZeroPage,
        Implicit, Immediate, Implicit, Immediate, Absolute, Absolute, Absolute, Absolute,
        Relative, IndirectY, Implicit, IndirectY, ZeroPageX, ZeroPageX, ZeroPageY, ZeroPageY,
        Implicit, AbsoluteY, Implicit, AbsoluteY, AbsoluteX, AbsoluteX, AbsoluteY, AbsoluteY,
        Immediate, IndirectX, Immediate, IndirectX, ZeroPage, ZeroPage, ZeroPage, ZeroPage,
        Implicit, Immediate, Implicit, Immediate, Absolute, Absolute, Absolute, Absolute,
        Relative, IndirectY, Implicit, IndirectY, ZeroPageX, ZeroPageX, ZeroPageX, ZeroPageX,
        Implicit, AbsoluteY, Implicit, AbsoluteY, AbsoluteX, AbsoluteX, AbsoluteX, AbsoluteX,
        Immediate, IndirectX, Immediate, IndirectX, ZeroPage, ZeroPage, ZeroPage, ZeroPage,
        Implicit, Immediate, Implicit, Immediate, Absolute, Absolute, Absolute, Absolute,
        Relative, IndirectY, Implicit, IndirectY, ZeroPageX, ZeroPageX, ZeroPageX, ZeroPageX,
        Implicit, AbsoluteY, Implicit, AbsoluteY, AbsoluteX, AbsoluteX, AbsoluteX, AbsoluteX,
    ];

    #[test]
    fn test_decode_matches_opcode_matrix() {
        for opcode in 0..=255u8 {
            assert_eq!(
                addressing_mode(opcode),
                MODES[opcode as usize],
                "opcode {:02X}",
                opcode
            );
        }
    }

    #[test]
    fn test_decode_is_total_over_raw_fields() {
        // Out-of-range field values are masked rather than rejected
        for group in 0..=255u8 {
            for mode in 0..8 {
                let _ = decode_addressing_mode(group, mode, 0xFF);
            }
        }
    }

    #[test]
    fn test_split_fields() {
        assert_eq!(split(0b101_110_01), (0b01, 0b110, 0b101)); // LDA abs,Y
        assert_eq!(split(0x6C), (0b00, 0b011, 0b011));
    }

    #[test]
    fn test_operand_length_matches_mode() {
        assert_eq!(addressing_mode(0xA9).operand_len(), 1);
        assert_eq!(addressing_mode(0x4C).operand_len(), 2);
        assert_eq!(addressing_mode(0xEA).operand_len(), 0);
        assert_eq!(addressing_mode(0x0A).operand_len(), 0);
    }

    #[test]
    fn test_jam_opcodes() {
        let jams: Vec<u8> = (0..=255u8)
            .filter(|&op| MNEMONICS[op as usize] == Mnemonic::Jam)
            .collect();
        assert_eq!(
            jams,
            vec![0x02, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72, 0x92, 0xB2, 0xD2, 0xF2]
        );
    }

    #[test]
    fn test_page_cross_table() {
        for op in [0x11u8, 0x19, 0x1C, 0x1D, 0x7D, 0xB1, 0xB3, 0xBB, 0xBE, 0xBF, 0xFD] {
            assert!(PAGE_CROSS_PENALTY[op as usize], "{:02X}", op);
        }
        for op in [0x91u8, 0x99, 0x9D, 0x1E, 0x1B, 0x13, 0xDE, 0xA9, 0xBA, 0xB8] {
            assert!(!PAGE_CROSS_PENALTY[op as usize], "{:02X}", op);
        }
    }

    #[test]
    fn test_cycle_table_spot_checks() {
        assert_eq!(CYCLES[0x00], 7); // BRK
        assert_eq!(CYCLES[0x20], 6); // JSR
        assert_eq!(CYCLES[0x4C], 3); // JMP abs
        assert_eq!(CYCLES[0x6C], 5); // JMP ind
        assert_eq!(CYCLES[0x91], 6); // STA (zp),Y
        assert_eq!(CYCLES[0xEA], 2);
        assert_eq!(CYCLES[0x1B], 7); // SLO abs,Y
    }

    #[test]
    fn test_official_set() {
        let official = (0..=255u8).filter(|&op| is_official(op)).count();
        assert_eq!(official, 151);
        assert!(!is_official(0xEB));
        assert!(is_official(0xE9));
        assert!(!is_official(0x1A));
    }
}
