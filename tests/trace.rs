mod common;

use famicore::{Cartridge, Config, CpuBus, Error, Nes, TraceTarget};

fn boot(program: &[u8], config: &Config) -> Nes {
    let cartridge = Cartridge::load_from_bytes(&common::nrom128(program)).unwrap();
    Nes::new(cartridge, config).unwrap()
}

// Counts X down in a loop, then calls a subroutine that uses LAX.
const COUNTDOWN: &[u8] = &[
    0xA2, 0x05, // LDX #$05
    0x86, 0x10, // STX $10
    0xCA, // DEX
    0xD0, 0xFD, // BNE $8004
    0x20, 0x0D, 0x80, // JSR $800D
    0x4C, 0x0A, 0x80, // JMP $800A
    0xA7, 0x10, // LAX $10
    0x60, // RTS
];

#[test]
fn countdown_program_trace() {
    let expected = [
        "8000  A2 05     LDX #$05                        A:00 X:00 Y:00 P:24 SP:FD CYC:7",
        "8002  86 10     STX $10 = 00                    A:00 X:05 Y:00 P:24 SP:FD CYC:9",
        "8004  CA        DEX                             A:00 X:05 Y:00 P:24 SP:FD CYC:12",
        "8005  D0 FD     BNE $8004                       A:00 X:04 Y:00 P:24 SP:FD CYC:14",
        "8004  CA        DEX                             A:00 X:04 Y:00 P:24 SP:FD CYC:17",
        "8005  D0 FD     BNE $8004                       A:00 X:03 Y:00 P:24 SP:FD CYC:19",
        "8004  CA        DEX                             A:00 X:03 Y:00 P:24 SP:FD CYC:22",
        "8005  D0 FD     BNE $8004                       A:00 X:02 Y:00 P:24 SP:FD CYC:24",
        "8004  CA        DEX                             A:00 X:02 Y:00 P:24 SP:FD CYC:27",
        "8005  D0 FD     BNE $8004                       A:00 X:01 Y:00 P:24 SP:FD CYC:29",
        "8004  CA        DEX                             A:00 X:01 Y:00 P:24 SP:FD CYC:32",
        "8005  D0 FD     BNE $8004                       A:00 X:00 Y:00 P:26 SP:FD CYC:34",
        "8007  20 0D 80  JSR $800D                       A:00 X:00 Y:00 P:26 SP:FD CYC:36",
        "800D  A7 10    *LAX $10 = 05                    A:00 X:00 Y:00 P:26 SP:FB CYC:42",
        "800F  60        RTS                             A:05 X:05 Y:00 P:24 SP:FB CYC:45",
        "800A  4C 0A 80  JMP $800A                       A:05 X:05 Y:00 P:24 SP:FD CYC:51",
    ];

    let mut nes = boot(COUNTDOWN, &Config::default());
    for want in expected {
        let (line, _) = nes.trace_step().unwrap();
        assert_eq!(line, want);
    }
    assert_eq!(nes.instructions(), expected.len() as u64);
    assert_eq!(nes.cpu().cycles, 54);
}

// Walks every operand format once. Ends on `JMP ($80FF)`, whose high
// byte comes from $8000, landing on a jump-to-self at $A240.
const OPERAND_TOUR: &[u8] = &[
    0xA2, 0x02, // LDX #$02
    0xA0, 0x03, // LDY #$03
    0xA9, 0xF0, // LDA #$F0
    0x95, 0x10, // STA $10,X
    0x96, 0x20, // STX $20,Y
    0xB6, 0x0F, // LDX $0F,Y
    0xBD, 0x20, 0x81, // LDA $8120,X
    0x99, 0x00, 0x02, // STA $0200,Y
    0xA9, 0x03, // LDA #$03
    0x85, 0x40, // STA $40
    0xA9, 0x02, // LDA #$02
    0x85, 0x41, // STA $41
    0xA2, 0x00, // LDX #$00
    0xA1, 0x40, // LDA ($40,X)
    0xB1, 0x40, // LDA ($40),Y
    0x38, // SEC
    0x6A, // ROR A
    0xE6, 0x40, // INC $40
    0x0E, 0x03, 0x02, // ASL $0203
    0x6C, 0xFF, 0x80, // JMP ($80FF)
];

#[test]
fn operand_formats_trace() {
    let mut program = vec![0xEA; 0x2243];
    program[..OPERAND_TOUR.len()].copy_from_slice(OPERAND_TOUR);
    program[0xFF] = 0x40;
    program[0x2240..].copy_from_slice(&[0x4C, 0x40, 0xA2]); // JMP $A240

    let expected = [
        "8000  A2 02     LDX #$02                        A:00 X:00 Y:00 P:24 SP:FD CYC:7",
        "8002  A0 03     LDY #$03                        A:00 X:02 Y:00 P:24 SP:FD CYC:9",
        "8004  A9 F0     LDA #$F0                        A:00 X:02 Y:03 P:24 SP:FD CYC:11",
        "8006  95 10     STA $10,X @ 12 = 00             A:F0 X:02 Y:03 P:A4 SP:FD CYC:13",
        "8008  96 20     STX $20,Y @ 23 = 00             A:F0 X:02 Y:03 P:A4 SP:FD CYC:17",
        "800A  B6 0F     LDX $0F,Y @ 12 = F0             A:F0 X:02 Y:03 P:A4 SP:FD CYC:21",
        "800C  BD 20 81  LDA $8120,X @ 8210 = EA         A:F0 X:F0 Y:03 P:A4 SP:FD CYC:25",
        "800F  99 00 02  STA $0200,Y @ 0203 = 00         A:EA X:F0 Y:03 P:A4 SP:FD CYC:30",
        "8012  A9 03     LDA #$03                        A:EA X:F0 Y:03 P:A4 SP:FD CYC:35",
        "8014  85 40     STA $40 = 00                    A:03 X:F0 Y:03 P:24 SP:FD CYC:37",
        "8016  A9 02     LDA #$02                        A:03 X:F0 Y:03 P:24 SP:FD CYC:40",
        "8018  85 41     STA $41 = 00                    A:02 X:F0 Y:03 P:24 SP:FD CYC:42",
        "801A  A2 00     LDX #$00                        A:02 X:F0 Y:03 P:24 SP:FD CYC:45",
        "801C  A1 40     LDA ($40,X) @ 40 = 0203 = EA    A:02 X:00 Y:03 P:26 SP:FD CYC:47",
        "801E  B1 40     LDA ($40),Y = 0203 @ 0206 = 00  A:EA X:00 Y:03 P:A4 SP:FD CYC:53",
        "8020  38        SEC                             A:00 X:00 Y:03 P:26 SP:FD CYC:58",
        "8021  6A        ROR A                           A:00 X:00 Y:03 P:27 SP:FD CYC:60",
        "8022  E6 40     INC $40 = 03                    A:80 X:00 Y:03 P:A4 SP:FD CYC:62",
        "8024  0E 03 02  ASL $0203 = EA                  A:80 X:00 Y:03 P:24 SP:FD CYC:67",
        "8027  6C FF 80  JMP ($80FF) = A240              A:80 X:00 Y:03 P:A5 SP:FD CYC:73",
        "A240  4C 40 A2  JMP $A240                       A:80 X:00 Y:03 P:A5 SP:FD CYC:78",
    ];

    let mut nes = boot(&program, &Config::default());
    for want in expected {
        let (line, _) = nes.trace_step().unwrap();
        assert_eq!(line, want);
    }
    assert_eq!(nes.cpu().pc, 0xA240);
    assert_eq!(nes.cpu().cycles, 81);

    let mut bus = nes.bus();
    assert_eq!(bus.get(0x0040).unwrap(), 0x04);
    assert_eq!(bus.get(0x0203).unwrap(), 0xD4);
}

#[test]
fn io_window_traces_as_open_bus() {
    // LDA #$0F; STA $4015; LDA $4015
    let mut nes = boot(&[0xA9, 0x0F, 0x8D, 0x15, 0x40, 0xAD, 0x15, 0x40], &Config::default());
    let expected = [
        "8000  A9 0F     LDA #$0F                        A:00 X:00 Y:00 P:24 SP:FD CYC:7",
        "8002  8D 15 40  STA $4015 = FF                  A:0F X:00 Y:00 P:24 SP:FD CYC:9",
        "8005  AD 15 40  LDA $4015 = FF                  A:0F X:00 Y:00 P:24 SP:FD CYC:13",
        "8008  EA        NOP                             A:0F X:00 Y:00 P:24 SP:FD CYC:17",
    ];
    for want in expected {
        let (line, _) = nes.trace_step().unwrap();
        assert_eq!(line, want);
    }
    // The CPU itself still reads back what it wrote.
    assert_eq!(nes.cpu().a, 0x0F);
}

#[test]
fn tracing_does_not_change_execution() {
    let mut quiet = boot(COUNTDOWN, &Config::default());
    let mut traced = boot(COUNTDOWN, &Config::default().with_trace(TraceTarget::Log));
    for _ in 0..40 {
        quiet.step().unwrap();
        traced.step().unwrap();
    }
    assert_eq!(quiet.cpu(), traced.cpu());
}

#[test]
fn traced_status_read_still_clears_vblank_once() {
    // LDA $2002; LDA $2002
    let mut nes = boot(&[0xAD, 0x02, 0x20, 0xAD, 0x02, 0x20], &Config::default());
    nes.ppu_mut().set_vblank(true);

    let (line, cycles) = nes.trace_step().unwrap();
    assert!(line.contains("LDA $2002 = 80"));
    assert_eq!(cycles, 4);
    assert_eq!(nes.cpu().a & 0x80, 0x80);

    let (line, _) = nes.trace_step().unwrap();
    assert!(line.contains("LDA $2002 = 00"));
    assert_eq!(nes.cpu().a & 0x80, 0x00);
}

#[test]
fn program_drives_ppu_registers() {
    let program = [
        0xA9, 0x21, // LDA #$21
        0x8D, 0x06, 0x20, // STA $2006
        0xA9, 0x08, // LDA #$08
        0x8D, 0x06, 0x20, // STA $2006
        0xA9, 0x5A, // LDA #$5A
        0x8D, 0x07, 0x20, // STA $2007
        0xAD, 0x02, 0x20, // LDA $2002
    ];
    let mut nes = boot(&program, &Config::default());
    nes.run(7).unwrap();

    assert_eq!(nes.ppu().vram_addr(), 0x2109);
    assert_eq!(nes.ppu().get_mmap(0x2108).unwrap(), 0x5A);
    // Undriven status bits echo the last value on the PPU bus.
    assert_eq!(nes.cpu().a, 0x1A);
}

#[test]
fn unknown_opcode_stops_the_run() {
    // NOP; KIL
    let mut nes = boot(&[0xEA, 0x02], &Config::default());
    let err = nes.run(5).unwrap_err();
    assert!(matches!(
        err,
        Error::UnknownOpcode {
            opcode: 0x02,
            addr: 0x8001
        }
    ));
    assert_eq!(nes.instructions(), 1);
}

#[test]
fn writes_to_prg_rom_are_errors() {
    // LDA #$01; STA $8000
    let mut nes = boot(&[0xA9, 0x01, 0x8D, 0x00, 0x80], &Config::default());
    nes.step().unwrap();
    assert!(matches!(nes.step(), Err(Error::InvalidWrite(0x8000))));
}
