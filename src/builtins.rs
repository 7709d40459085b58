use std::{
    cell::RefCell,
    collections::HashMap,
    fmt,
    fs::{File, OpenOptions},
    io::{self, BufRead, BufReader, Read, Write},
    rc::Rc,
};

use crate::{
    common::ErrorKind,
    value::{Arity, Builtin, Value},
};

/// Handles 0 to 2 mirror the standard streams and are never handed out.
const FIRST_HANDLE: i64 = 3;

/// Process state the builtins act on: the output and input streams plus the
/// files opened with `fopen`. Open files are closed when the host is dropped.
pub struct Host {
    output: Box<dyn Write>,
    input: Box<dyn BufRead>,
    files: HashMap<i64, File>,
    next_handle: i64,
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("output", &"<writer>")
            .field("input", &"<reader>")
            .field("files", &self.files.keys().collect::<Vec<_>>())
            .field("next_handle", &self.next_handle)
            .finish()
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl Host {
    pub fn new() -> Self {
        Self::with_io(
            Box::new(io::stdout()),
            Box::new(BufReader::new(io::stdin())),
        )
    }

    pub fn with_io(output: Box<dyn Write>, input: Box<dyn BufRead>) -> Self {
        Host {
            output,
            input,
            files: HashMap::new(),
            next_handle: FIRST_HANDLE,
        }
    }

    pub fn open_files(&self) -> usize {
        self.files.len()
    }

    fn file(&mut self, builtin: &'static str, handle: i64) -> Result<&mut File, ErrorKind> {
        self.files
            .get_mut(&handle)
            .ok_or_else(|| failure(builtin, format!("invalid file handle {}", handle)))
    }
}

/// In-memory writer whose clones share one buffer. Handy as a [`Host`]
/// output when the text written by a program has to be inspected.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn failure(builtin: &'static str, message: impl Into<String>) -> ErrorKind {
    ErrorKind::Builtin {
        builtin,
        message: message.into(),
    }
}

fn io_failure(builtin: &'static str) -> impl Fn(io::Error) -> ErrorKind {
    move |err| failure(builtin, err.to_string())
}

fn expect_string(builtin: &'static str, value: &Value) -> Result<String, ErrorKind> {
    match value {
        Value::String(string) => Ok(string.clone()),
        other => Err(failure(
            builtin,
            format!("expected string argument but got {}", other.type_name()),
        )),
    }
}

fn expect_handle(builtin: &'static str, value: &Value) -> Result<i64, ErrorKind> {
    match value {
        Value::Integer(handle) => Ok(*handle),
        other => Err(failure(
            builtin,
            format!("expected file handle but got {}", other.type_name()),
        )),
    }
}

// len(s: string): integer, counted in UTF-8 bytes
fn len(_: &mut Host, args: Vec<Value>) -> Result<Option<Value>, ErrorKind> {
    let string = expect_string("len", &args[0])?;
    Ok(Some(Value::Integer(string.len() as i64)))
}

fn write_values(host: &mut Host, builtin: &'static str, args: &[Value]) -> Result<(), ErrorKind> {
    for arg in args {
        // only values with a textual form are written
        match arg {
            Value::String(_) | Value::Integer(_) | Value::Boolean(_) => {
                write!(host.output, "{}", arg).map_err(io_failure(builtin))?
            }
            _ => log::trace!("{} skips a {} value", builtin, arg.type_name()),
        }
    }
    Ok(())
}

// print(...)
fn print(host: &mut Host, args: Vec<Value>) -> Result<Option<Value>, ErrorKind> {
    write_values(host, "print", &args)?;
    host.output.flush().map_err(io_failure("print"))?;
    Ok(None)
}

// println(...)
fn println(host: &mut Host, args: Vec<Value>) -> Result<Option<Value>, ErrorKind> {
    write_values(host, "println", &args)?;
    writeln!(host.output).map_err(io_failure("println"))?;
    host.output.flush().map_err(io_failure("println"))?;
    Ok(None)
}

// type(value): string
fn type_of(_: &mut Host, args: Vec<Value>) -> Result<Option<Value>, ErrorKind> {
    Ok(Some(Value::String(args[0].type_name().to_string())))
}

// scan(like: string | integer | boolean): same type as `like`, also stored
// into `like` when it is a variable
fn scan(host: &mut Host, args: Vec<Value>) -> Result<Option<Value>, ErrorKind> {
    let mut line = String::new();
    let read = host.input.read_line(&mut line).map_err(io_failure("scan"))?;
    if read == 0 {
        return Err(failure("scan", "end of input"));
    }
    let line = line.trim_end_matches(['\r', '\n']);

    let value = match &args[0] {
        Value::String(_) => Value::String(line.to_string()),
        Value::Integer(_) => line
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| failure("scan", format!("\"{}\" is not an integer", line)))?,
        Value::Boolean(_) => match line.trim() {
            "true" => Value::Boolean(true),
            "false" => Value::Boolean(false),
            _ => return Err(failure("scan", format!("\"{}\" is not a boolean", line))),
        },
        other => {
            return Err(failure(
                "scan",
                format!("cannot scan into {}", other.type_name()),
            ))
        }
    };

    Ok(Some(value))
}

// fopen(path: string): integer, 0 when the file can't be opened
fn fopen(host: &mut Host, args: Vec<Value>) -> Result<Option<Value>, ErrorKind> {
    let path = expect_string("fopen", &args[0])?;

    let file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(&path);

    match file {
        Ok(file) => {
            let handle = host.next_handle;
            host.next_handle += 1;
            host.files.insert(handle, file);
            log::debug!("opened {} as handle {}", path, handle);
            Ok(Some(Value::Integer(handle)))
        }
        Err(err) => {
            log::debug!("could not open {}: {}", path, err);
            Ok(Some(Value::Integer(0)))
        }
    }
}

// fread(handle: integer): string
fn fread(host: &mut Host, args: Vec<Value>) -> Result<Option<Value>, ErrorKind> {
    let handle = expect_handle("fread", &args[0])?;

    let mut contents = String::new();
    host.file("fread", handle)?
        .read_to_string(&mut contents)
        .map_err(io_failure("fread"))?;

    Ok(Some(Value::String(contents)))
}

// fwrite(handle: integer, data: string)
fn fwrite(host: &mut Host, args: Vec<Value>) -> Result<Option<Value>, ErrorKind> {
    let handle = expect_handle("fwrite", &args[0])?;
    let data = expect_string("fwrite", &args[1])?;

    host.file("fwrite", handle)?
        .write_all(data.as_bytes())
        .map_err(io_failure("fwrite"))?;

    Ok(None)
}

// fclose(handle: integer)
fn fclose(host: &mut Host, args: Vec<Value>) -> Result<Option<Value>, ErrorKind> {
    let handle = expect_handle("fclose", &args[0])?;

    match host.files.remove(&handle) {
        Some(_) => {
            log::debug!("closed handle {}", handle);
            Ok(None)
        }
        None => Err(failure("fclose", format!("invalid file handle {}", handle))),
    }
}

const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "len",
        arity: Arity::Fixed(1),
        func: len,
        writes_back: false,
    },
    Builtin {
        name: "print",
        arity: Arity::Variadic,
        func: print,
        writes_back: false,
    },
    Builtin {
        name: "println",
        arity: Arity::Variadic,
        func: println,
        writes_back: false,
    },
    Builtin {
        name: "type",
        arity: Arity::Fixed(1),
        func: type_of,
        writes_back: false,
    },
    Builtin {
        name: "scan",
        arity: Arity::Fixed(1),
        func: scan,
        writes_back: true,
    },
    Builtin {
        name: "fopen",
        arity: Arity::Fixed(1),
        func: fopen,
        writes_back: false,
    },
    Builtin {
        name: "fread",
        arity: Arity::Fixed(1),
        func: fread,
        writes_back: false,
    },
    Builtin {
        name: "fwrite",
        arity: Arity::Fixed(2),
        func: fwrite,
        writes_back: false,
    },
    Builtin {
        name: "fclose",
        arity: Arity::Fixed(1),
        func: fclose,
        writes_back: false,
    },
];

pub fn lookup(name: &str) -> Option<Builtin> {
    BUILTINS.iter().find(|builtin| builtin.name == name).cloned()
}
