use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Generates the `pack8`/`unpack8` dispatch tables for bit-widths 0..=32 (u32
/// lanes) and 0..=64 (u64 lanes). These are pure functions of the width, so
/// there's no reason to hand-write 33 + 65 copies of them; emit them here
/// and `include!` the result from `util::bit_util`.
fn main() {
  let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set by cargo");
  let dest_path = Path::new(&out_dir).join("bit_pack_tables.rs");
  let mut f = File::create(&dest_path).expect("create bit_pack_tables.rs");

  writeln!(f, "// @generated by build.rs — do not edit.").unwrap();
  emit_family(&mut f, "u32", 32);
  emit_family(&mut f, "u64", 64);

  println!("cargo:rerun-if-changed=build.rs");
}

fn emit_family(f: &mut File, lane: &str, max_width: usize) {
  // The bit accumulator must hold a residual of up to 7 leftover bits plus
  // one full `max_width`-bit value without overflowing. u64 covers that for
  // the u32 lane (7 + 32 = 39 bits) but not for the u64 lane (7 + 64 = 71
  // bits), so the u64 lane accumulates into u128.
  let acc = if max_width > 32 { "u128" } else { "u64" };

  writeln!(
    f,
    "pub const PACK8_{}: [fn(&[{}; 8], &mut [u8]) -> usize; {}] = [",
    lane.to_uppercase(), lane, max_width + 1
  ).unwrap();
  for w in 0..=max_width {
    writeln!(f, "    pack8_{}_w{},", lane, w).unwrap();
  }
  writeln!(f, "];\n").unwrap();

  writeln!(
    f,
    "pub const UNPACK8_{}: [fn(&[u8], &mut [{}; 8]) -> usize; {}] = [",
    lane.to_uppercase(), lane, max_width + 1
  ).unwrap();
  for w in 0..=max_width {
    writeln!(f, "    unpack8_{}_w{},", lane, w).unwrap();
  }
  writeln!(f, "];\n").unwrap();

  for w in 0..=max_width {
    emit_pack_fn(f, lane, w, acc);
    emit_unpack_fn(f, lane, w, acc);
  }
}

fn emit_pack_fn(f: &mut File, lane: &str, w: usize, acc: &str) {
  writeln!(
    f,
    "#[inline]\npub fn pack8_{}_w{}(input: &[{}; 8], out: &mut [u8]) -> usize {{",
    lane, w, lane
  ).unwrap();
  if w == 0 {
    writeln!(f, "    let _ = (input, out);\n    0\n}}\n").unwrap();
    return;
  }
  writeln!(f, "    debug_assert!(out.len() >= {});", (w * 8 + 7) / 8).unwrap();
  writeln!(f, "    let mut buffered: {} = 0;", acc).unwrap();
  writeln!(f, "    let mut bits_in_buffer: u32 = 0;").unwrap();
  writeln!(f, "    let mut out_pos = 0usize;").unwrap();
  writeln!(f, "    for &v in input.iter() {{").unwrap();
  writeln!(f, "        buffered |= (v as {}) << bits_in_buffer;", acc).unwrap();
  writeln!(f, "        bits_in_buffer += {};", w).unwrap();
  writeln!(f, "        while bits_in_buffer >= 8 {{").unwrap();
  writeln!(f, "            out[out_pos] = (buffered & 0xFF) as u8;").unwrap();
  writeln!(f, "            out_pos += 1;").unwrap();
  writeln!(f, "            buffered >>= 8;").unwrap();
  writeln!(f, "            bits_in_buffer -= 8;").unwrap();
  writeln!(f, "        }}").unwrap();
  writeln!(f, "    }}").unwrap();
  writeln!(f, "    if bits_in_buffer > 0 {{").unwrap();
  writeln!(f, "        out[out_pos] = (buffered & 0xFF) as u8;").unwrap();
  writeln!(f, "        out_pos += 1;").unwrap();
  writeln!(f, "    }}").unwrap();
  writeln!(f, "    out_pos\n}}\n").unwrap();
}

fn emit_unpack_fn(f: &mut File, lane: &str, w: usize, acc: &str) {
  writeln!(
    f,
    "#[inline]\npub fn unpack8_{}_w{}(input: &[u8], out: &mut [{}; 8]) -> usize {{",
    lane, w, lane
  ).unwrap();
  if w == 0 {
    writeln!(f, "    let _ = input;\n    *out = [0; 8];\n    0\n}}\n").unwrap();
    return;
  }
  let nbytes = (w * 8 + 7) / 8;
  writeln!(f, "    debug_assert!(input.len() >= {});", nbytes).unwrap();
  writeln!(f, "    let mut buffered: {} = 0;", acc).unwrap();
  writeln!(f, "    let mut bits_in_buffer: u32 = 0;").unwrap();
  writeln!(f, "    let mut in_pos = 0usize;").unwrap();
  writeln!(f, "    let mask: {} = (1{} << {}) - 1;", acc, acc, w).unwrap();
  writeln!(f, "    for slot in out.iter_mut() {{").unwrap();
  writeln!(f, "        while bits_in_buffer < {} {{", w).unwrap();
  writeln!(f, "            buffered |= (input[in_pos] as {}) << bits_in_buffer;", acc).unwrap();
  writeln!(f, "            in_pos += 1;").unwrap();
  writeln!(f, "            bits_in_buffer += 8;").unwrap();
  writeln!(f, "        }}").unwrap();
  writeln!(f, "        *slot = (buffered & mask) as {};", lane).unwrap();
  writeln!(f, "        buffered >>= {};", w).unwrap();
  writeln!(f, "        bits_in_buffer -= {};", w).unwrap();
  writeln!(f, "    }}").unwrap();
  writeln!(f, "    {}\n}}\n", nbytes).unwrap();
}
