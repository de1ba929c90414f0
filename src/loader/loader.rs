use std::fs;

use log::info;
use regex::Regex;

use crate::instructions::instructions::{FuClass, Instr, Program, RegisterType};

#[derive(Debug)]
pub(crate) enum LoadError {
    IOError(String),
    ParseError(String),
}

struct Loader {
    src: String,
    code: Vec<Instr>,
}

impl Loader {
    // One instruction per line: <hex address> <fu> <dest> <src1> <src2>,
    // where -1 marks an absent class/register.
    fn load(&mut self) -> Result<(), LoadError> {
        let line_regex = Regex::new(r"^(?:0x)?([0-9a-fA-F]+)\s+(-1|\d+)\s+(-1|\d+)\s+(-1|\d+)\s+(-1|\d+)$").unwrap();

        for (line_index, line) in self.src.lines().enumerate() {
            let line_number = line_index + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let captures = match line_regex.captures(line) {
                Some(captures) => captures,
                None => {
                    return Err(LoadError::ParseError(
                        format!("Malformed trace line '{}' at line {}", line, line_number)));
                }
            };

            let addr = match u64::from_str_radix(&captures[1], 16) {
                Ok(addr) => addr,
                Err(_) => {
                    return Err(LoadError::ParseError(
                        format!("Illegal instruction address '{}' at line {}", &captures[1], line_number)));
                }
            };

            let fu_class = Self::parse_fu_class(&captures[2], line_number)?;
            let dest = Self::parse_register(&captures[3], line_number)?;
            let src0 = Self::parse_register(&captures[4], line_number)?;
            let src1 = Self::parse_register(&captures[5], line_number)?;

            self.code.push(Instr::new(addr, fu_class, dest, [src0, src1]));
        }

        Ok(())
    }

    fn parse_fu_class(field: &str, line_number: usize) -> Result<Option<FuClass>, LoadError> {
        if field == "-1" {
            return Ok(None);
        }

        match field.parse::<usize>().ok().and_then(FuClass::from_index) {
            Some(fu_class) => Ok(Some(fu_class)),
            None => Err(LoadError::ParseError(
                format!("Illegal functional-unit class '{}' at line {}", field, line_number))),
        }
    }

    fn parse_register(field: &str, line_number: usize) -> Result<Option<RegisterType>, LoadError> {
        if field == "-1" {
            return Ok(None);
        }

        match field.parse::<RegisterType>() {
            Ok(reg) => Ok(Some(reg)),
            Err(_) => Err(LoadError::ParseError(
                format!("Illegal register '{}' at line {}", field, line_number))),
        }
    }
}

pub(crate) fn load(path: &str) -> Result<Program, LoadError> {
    let src = match fs::read_to_string(path) {
        Ok(src) => src,
        Err(err) => {
            return Err(LoadError::IOError(format!("Error reading file '{}': {}", path, err)));
        }
    };

    let program = load_from_string(src)?;
    info!("loaded {} trace instructions from '{}'", program.len(), path);
    Ok(program)
}

pub(crate) fn load_from_string(src: String) -> Result<Program, LoadError> {
    let mut loader = Loader {
        src,
        code: Vec::new(),
    };

    loader.load()?;

    Ok(Program { code: loader.code })
}
