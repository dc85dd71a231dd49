//! Mapping file names to fence labels for Markdown code blocks.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;

const MARKDOWN_LABEL: &str = "markdown";
const FALLBACK_LABEL: &str = "plaintext";

/// Extension to fence label, lowercased on both sides. Ambiguous extensions
/// (`.pl`, `.r`, `.h`, `.m`, `.v`) are pinned to one winner here instead of
/// depending on table iteration order.
const EXTENSION_LABELS: &[(&str, &str)] = &[
    ("ada", "ada"),
    ("adb", "ada"),
    ("ads", "ada"),
    ("asm", "asm"),
    ("awk", "awk"),
    ("bat", "batch"),
    ("bash", "bash"),
    ("bib", "bibtex"),
    ("c", "c"),
    ("cbl", "cobol"),
    ("cc", "cpp"),
    ("cfg", "ini"),
    ("cjs", "javascript"),
    ("cl", "lisp"),
    ("clj", "clojure"),
    ("cljc", "clojure"),
    ("cljs", "clojure"),
    ("cmake", "cmake"),
    ("cmd", "batch"),
    ("cob", "cobol"),
    ("coffee", "coffeescript"),
    ("conf", "ini"),
    ("cpp", "cpp"),
    ("cr", "crystal"),
    ("cs", "csharp"),
    ("csproj", "xml"),
    ("css", "css"),
    ("csv", "csv"),
    ("csx", "csharp"),
    ("cts", "typescript"),
    ("cxx", "cpp"),
    ("d", "d"),
    ("dart", "dart"),
    ("diff", "diff"),
    ("edn", "clojure"),
    ("el", "lisp"),
    ("elm", "elm"),
    ("erb", "erb"),
    ("erl", "erlang"),
    ("ex", "elixir"),
    ("exs", "elixir"),
    ("f", "fortran"),
    ("f03", "fortran"),
    ("f90", "fortran"),
    ("f95", "fortran"),
    ("fish", "fish"),
    ("fs", "fsharp"),
    ("fsi", "fsharp"),
    ("fsx", "fsharp"),
    ("gemspec", "ruby"),
    ("geojson", "json"),
    ("go", "go"),
    ("gql", "graphql"),
    ("gradle", "groovy"),
    ("graphql", "graphql"),
    ("groovy", "groovy"),
    ("h", "c"),
    ("hcl", "hcl"),
    ("hh", "cpp"),
    ("hpp", "cpp"),
    ("hrl", "erlang"),
    ("hs", "haskell"),
    ("htm", "html"),
    ("html", "html"),
    ("hxx", "cpp"),
    ("ini", "ini"),
    ("ino", "cpp"),
    ("java", "java"),
    ("jl", "julia"),
    ("js", "javascript"),
    ("json", "json"),
    ("jsonc", "jsonc"),
    ("jsx", "jsx"),
    ("kt", "kotlin"),
    ("kts", "kotlin"),
    ("less", "less"),
    ("lhs", "haskell"),
    ("lisp", "lisp"),
    ("log", "plaintext"),
    ("lua", "lua"),
    ("m", "objectivec"),
    ("mjs", "javascript"),
    ("mk", "makefile"),
    ("ml", "ocaml"),
    ("mli", "ocaml"),
    ("mm", "objectivec"),
    ("mts", "typescript"),
    ("nim", "nim"),
    ("pas", "pascal"),
    ("patch", "diff"),
    ("php", "php"),
    ("phtml", "php"),
    ("pl", "perl"),
    ("plist", "xml"),
    ("pm", "perl"),
    ("pp", "pascal"),
    ("pro", "prolog"),
    ("props", "xml"),
    ("proto", "protobuf"),
    ("ps1", "powershell"),
    ("psd1", "powershell"),
    ("psm1", "powershell"),
    ("py", "python"),
    ("pyi", "python"),
    ("pyw", "python"),
    ("r", "r"),
    ("rake", "ruby"),
    ("rb", "ruby"),
    ("rs", "rust"),
    ("rst", "rst"),
    ("sass", "sass"),
    ("sbt", "scala"),
    ("scala", "scala"),
    ("scm", "scheme"),
    ("scss", "scss"),
    ("sh", "bash"),
    ("sol", "solidity"),
    ("sql", "sql"),
    ("ss", "scheme"),
    ("svelte", "svelte"),
    ("svg", "xml"),
    ("swift", "swift"),
    ("targets", "xml"),
    ("tcl", "tcl"),
    ("tex", "latex"),
    ("text", "plaintext"),
    ("tf", "terraform"),
    ("tfvars", "terraform"),
    ("toml", "toml"),
    ("ts", "typescript"),
    ("tsv", "tsv"),
    ("tsx", "tsx"),
    ("txt", "plaintext"),
    ("v", "verilog"),
    ("vb", "vb"),
    ("vbproj", "xml"),
    ("vhd", "vhdl"),
    ("vhdl", "vhdl"),
    ("vim", "vim"),
    ("vue", "vue"),
    ("xhtml", "html"),
    ("xml", "xml"),
    ("xsd", "xml"),
    ("xsl", "xml"),
    ("xslt", "xml"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("zig", "zig"),
    ("zsh", "bash"),
];

/// Exact (lowercased) file names without a useful extension.
const BASENAME_LABELS: &[(&str, &str)] = &[
    (".bash_profile", "bash"),
    (".bashrc", "bash"),
    (".editorconfig", "ini"),
    (".gitattributes", "gitattributes"),
    (".gitignore", "gitignore"),
    (".gitmodules", "ini"),
    (".npmrc", "ini"),
    (".profile", "bash"),
    (".vimrc", "vim"),
    (".zshrc", "bash"),
    ("cmakelists.txt", "cmake"),
    ("containerfile", "dockerfile"),
    ("dockerfile", "dockerfile"),
    ("gemfile", "ruby"),
    ("gnumakefile", "makefile"),
    ("makefile", "makefile"),
    ("rakefile", "ruby"),
    ("vagrantfile", "ruby"),
];

/// Lookup from file names to fenced-code-block labels.
///
/// Constructed once per invocation and passed by reference; there is no
/// process-wide table.
#[derive(Debug)]
pub struct LanguageMap {
    extensions: HashMap<&'static str, &'static str>,
    basenames: HashMap<&'static str, &'static str>,
}

impl LanguageMap {
    pub fn new() -> Self {
        Self {
            extensions: EXTENSION_LABELS.iter().copied().collect(),
            basenames: BASENAME_LABELS.iter().copied().collect(),
        }
    }

    /// Whether the file name alone marks this path as text.
    pub fn knows(&self, path: &Path) -> bool {
        if let Some(name) = lowercase_file_name(path)
            && self.basenames.contains_key(name.as_str())
        {
            return true;
        }
        extension_of(path).is_some_and(|ext| {
            is_markdown_extension(&ext) || self.extensions.contains_key(ext.as_str())
        })
    }

    /// Fence label for `path`. Total: unknown extensions label as themselves,
    /// extension-less files as `plaintext`.
    pub fn label_for(&self, path: &Path) -> String {
        let ext = extension_of(path);
        if let Some(ext) = ext.as_deref()
            && is_markdown_extension(ext)
        {
            return MARKDOWN_LABEL.to_owned();
        }
        if let Some(name) = lowercase_file_name(path)
            && let Some(label) = self.basenames.get(name.as_str())
        {
            return (*label).to_owned();
        }
        match ext {
            Some(ext) => match self.extensions.get(ext.as_str()) {
                Some(label) => (*label).to_owned(),
                None => ext,
            },
            None => FALLBACK_LABEL.to_owned(),
        }
    }

    /// Fence for a block with the given label. Markdown content is fenced
    /// with six backticks so files that themselves contain triple-backtick
    /// fences survive intact.
    pub fn fence_for(label: &str) -> &'static str {
        if label == MARKDOWN_LABEL { "``````" } else { "```" }
    }
}

impl Default for LanguageMap {
    fn default() -> Self {
        Self::new()
    }
}

fn is_markdown_extension(ext: &str) -> bool {
    matches!(ext, "md" | "markdown" | "mdown")
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(OsStr::to_str)
        .map(str::to_lowercase)
}

fn lowercase_file_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(OsStr::to_str)
        .map(str::to_lowercase)
}
