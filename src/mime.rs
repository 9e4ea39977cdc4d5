/// Extension-based MIME type inference.
///
/// Rules may match on MIME prefixes such as `image/` or `application/pdf`.
/// The MIME type of a file is guessed from its name alone; file contents are
/// never read.
///
/// # Examples
///
/// ```
/// use dorg::mime::MimeTable;
///
/// let table = MimeTable::default();
/// assert_eq!(table.guess("holiday.JPG"), Some("image/jpeg"));
/// assert_eq!(table.guess("notes.md"), Some("text/markdown"));
/// assert_eq!(table.guess("README"), None);
/// ```
use std::collections::HashMap;
use std::path::Path;

/// Compression suffixes that wrap another file type.
const COMPRESSION_SUFFIXES: &[&str] = &["gz", "z", "bz2", "xz", "br"];

/// Short tarball names and the double extension they stand for.
const SUFFIX_ALIASES: &[(&str, &str)] = &[
    ("tgz", "tar.gz"),
    ("taz", "tar.gz"),
    ("tz", "tar.gz"),
    ("tbz2", "tar.bz2"),
    ("txz", "tar.xz"),
];

/// The usual extension table of desktop systems, grouped by MIME type.
const STANDARD_TYPES: &[(&str, &[&str])] = &[
    // Applications
    ("application/epub+zip", &["epub"]),
    ("application/gzip", &["gzip"]),
    ("application/java-archive", &["jar"]),
    ("application/java-vm", &["class"]),
    ("application/javascript", &["jsm"]),
    ("application/json", &["json", "map"]),
    ("application/ld+json", &["jsonld"]),
    ("application/manifest+json", &["webmanifest"]),
    ("application/msword", &["doc", "dot", "wiz"]),
    ("application/n-quads", &["nq"]),
    ("application/n-triples", &["nt"]),
    ("application/octet-stream", &["bin", "a", "dll", "exe", "o", "obj", "so"]),
    ("application/oda", &["oda"]),
    ("application/ogg", &["ogx"]),
    ("application/pdf", &["pdf"]),
    ("application/pgp-signature", &["sig", "asc"]),
    ("application/pkcs7-mime", &["p7c"]),
    ("application/postscript", &["ps", "ai", "eps"]),
    ("application/rtf", &["rtf"]),
    ("application/sql", &["sql"]),
    ("application/toml", &["toml"]),
    ("application/trig", &["trig"]),
    ("application/vnd.android.package-archive", &["apk"]),
    ("application/vnd.apple.mpegurl", &["m3u", "m3u8"]),
    ("application/vnd.debian.binary-package", &["deb", "udeb"]),
    ("application/vnd.google-earth.kml+xml", &["kml"]),
    ("application/vnd.google-earth.kmz", &["kmz"]),
    ("application/vnd.ms-excel", &["xls", "xlb"]),
    ("application/vnd.ms-fontobject", &["eot"]),
    ("application/vnd.ms-powerpoint", &["ppt", "pot", "ppa", "pps", "pwz"]),
    ("application/vnd.oasis.opendocument.graphics", &["odg"]),
    ("application/vnd.oasis.opendocument.presentation", &["odp"]),
    ("application/vnd.oasis.opendocument.spreadsheet", &["ods"]),
    ("application/vnd.oasis.opendocument.text", &["odt"]),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        &["pptx"],
    ),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        &["xlsx"],
    ),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        &["docx"],
    ),
    ("application/vnd.rar", &["rar"]),
    ("application/vnd.visio", &["vsd"]),
    ("application/wasm", &["wasm"]),
    ("application/x-7z-compressed", &["7z"]),
    ("application/x-apple-diskimage", &["dmg"]),
    ("application/x-bcpio", &["bcpio"]),
    ("application/x-bittorrent", &["torrent"]),
    ("application/x-cpio", &["cpio"]),
    ("application/x-csh", &["csh"]),
    ("application/x-debian-package", &["ddeb"]),
    ("application/x-dvi", &["dvi"]),
    ("application/x-gtar", &["gtar"]),
    ("application/x-hdf", &["hdf"]),
    ("application/x-hdf5", &["h5"]),
    ("application/x-iso9660-image", &["iso"]),
    ("application/x-latex", &["latex"]),
    ("application/x-lzh-compressed", &["lzh", "lha"]),
    ("application/x-mif", &["mif"]),
    ("application/x-ms-shortcut", &["lnk"]),
    ("application/x-msdos-program", &["com", "bat"]),
    ("application/x-msi", &["msi"]),
    ("application/x-netcdf", &["cdf", "nc"]),
    ("application/x-pem-file", &["pem"]),
    ("application/x-pkcs12", &["p12", "pfx"]),
    ("application/x-pn-realaudio", &["ram"]),
    ("application/x-python-code", &["pyc", "pyo"]),
    ("application/x-redhat-package-manager", &["rpm"]),
    ("application/x-sh", &["sh"]),
    ("application/x-shar", &["shar"]),
    ("application/x-shockwave-flash", &["swf"]),
    ("application/x-sqlite3", &["sqlite", "sqlite3", "db"]),
    ("application/x-sv4cpio", &["sv4cpio"]),
    ("application/x-sv4crc", &["sv4crc"]),
    ("application/x-tar", &["tar"]),
    ("application/x-tcl", &["tcl"]),
    ("application/x-tex", &["tex"]),
    ("application/x-texinfo", &["texi", "texinfo"]),
    ("application/x-troff", &["roff", "t", "tr"]),
    ("application/x-troff-man", &["man"]),
    ("application/x-troff-me", &["me"]),
    ("application/x-troff-ms", &["ms"]),
    ("application/x-ustar", &["ustar"]),
    ("application/x-wais-source", &["src"]),
    ("application/x-x509-ca-cert", &["crt", "der", "cer"]),
    ("application/x-xpinstall", &["xpi"]),
    ("application/xhtml+xml", &["xhtml", "xht"]),
    ("application/xml", &["xsl", "rdf", "wsdl", "xpdl"]),
    ("application/yaml", &["yaml", "yml"]),
    ("application/zip", &["zip"]),
    // Audio
    ("audio/3gpp", &["3gp", "3gpp"]),
    ("audio/3gpp2", &["3g2", "3gpp2"]),
    ("audio/aac", &["aac", "adts", "loas", "ass"]),
    ("audio/basic", &["au", "snd"]),
    ("audio/flac", &["flac"]),
    ("audio/midi", &["mid", "midi", "kar"]),
    ("audio/mp4", &["m4a"]),
    ("audio/mpeg", &["mp3", "mp2", "mpga", "mpega"]),
    ("audio/ogg", &["oga", "ogg", "spx"]),
    ("audio/opus", &["opus"]),
    ("audio/x-matroska", &["mka"]),
    ("audio/x-aiff", &["aif", "aifc", "aiff"]),
    ("audio/x-ms-wma", &["wma"]),
    ("audio/x-pn-realaudio", &["ra"]),
    ("audio/x-wav", &["wav"]),
    // Fonts
    ("font/otf", &["otf"]),
    ("font/ttf", &["ttf"]),
    ("font/woff", &["woff"]),
    ("font/woff2", &["woff2"]),
    // Images
    ("image/avif", &["avif"]),
    ("image/bmp", &["bmp"]),
    ("image/gif", &["gif"]),
    ("image/heic", &["heic"]),
    ("image/heif", &["heif"]),
    ("image/ief", &["ief"]),
    ("image/jpeg", &["jpg", "jpe", "jpeg"]),
    ("image/jxl", &["jxl"]),
    ("image/png", &["png"]),
    ("image/svg+xml", &["svg", "svgz"]),
    ("image/tiff", &["tiff", "tif"]),
    ("image/vnd.adobe.photoshop", &["psd"]),
    ("image/vnd.djvu", &["djvu", "djv"]),
    ("image/vnd.microsoft.icon", &["ico"]),
    ("image/webp", &["webp"]),
    ("image/x-canon-cr2", &["cr2"]),
    ("image/x-cmu-raster", &["ras"]),
    ("image/x-nikon-nef", &["nef"]),
    ("image/x-portable-anymap", &["pnm"]),
    ("image/x-portable-bitmap", &["pbm"]),
    ("image/x-portable-graymap", &["pgm"]),
    ("image/x-portable-pixmap", &["ppm"]),
    ("image/x-rgb", &["rgb"]),
    ("image/x-xbitmap", &["xbm"]),
    ("image/x-xpixmap", &["xpm"]),
    ("image/x-xwindowdump", &["xwd"]),
    // Messages
    ("message/rfc822", &["eml", "mht", "mhtml", "nws"]),
    // Models
    ("model/gltf+json", &["gltf"]),
    ("model/gltf-binary", &["glb"]),
    ("model/stl", &["stl"]),
    ("model/obj", &["obj3d"]),
    // Text
    ("text/calendar", &["ics", "icz", "ifb"]),
    ("text/css", &["css"]),
    ("text/csv", &["csv"]),
    ("text/html", &["html", "htm", "shtml"]),
    ("text/javascript", &["js", "mjs"]),
    ("text/markdown", &["md", "markdown"]),
    ("text/n3", &["n3"]),
    ("text/plain", &["txt", "text", "log", "diff", "srt", "c", "h", "ksh", "pl"]),
    ("text/richtext", &["rtx"]),
    ("text/tab-separated-values", &["tsv"]),
    ("text/vtt", &["vtt"]),
    ("text/x-c++src", &["cpp", "cxx", "cc"]),
    ("text/x-diff", &["patch"]),
    ("text/x-java", &["java"]),
    ("text/x-python", &["py"]),
    ("text/x-rst", &["rst"]),
    ("text/x-rust", &["rs"]),
    ("text/x-setext", &["etx"]),
    ("text/x-sgml", &["sgm", "sgml"]),
    ("text/x-vcard", &["vcf", "vcard"]),
    ("text/xml", &["xml"]),
    // Video
    ("video/mp2t", &["ts"]),
    ("video/mp4", &["mp4", "m4v"]),
    ("video/mpeg", &["mpeg", "m1v", "mpa", "mpe", "mpg"]),
    ("video/ogg", &["ogv"]),
    ("video/quicktime", &["mov", "qt"]),
    ("video/webm", &["webm"]),
    ("video/x-flv", &["flv"]),
    ("video/x-matroska", &["mkv", "mk3d"]),
    ("video/x-ms-asf", &["asf", "asx"]),
    ("video/x-ms-wmv", &["wmv"]),
    ("video/x-msvideo", &["avi"]),
    ("video/x-sgi-movie", &["movie"]),
];

/// Maps lower-case file extensions to MIME types.
#[derive(Debug, Clone)]
pub struct MimeTable {
    extension_map: HashMap<String, &'static str>,
}

impl MimeTable {
    /// Creates a new `MimeTable` with the standard mappings.
    pub fn new() -> Self {
        let mut table = Self {
            extension_map: HashMap::new(),
        };
        table.populate_standard_mappings();
        table
    }

    fn populate_standard_mappings(&mut self) {
        for &(mime, extensions) in STANDARD_TYPES {
            for ext in extensions {
                self.add(ext, mime);
            }
        }
    }

    /// Adds or replaces an extension to MIME type mapping.
    pub fn add(&mut self, ext: &str, mime: &'static str) {
        self.extension_map.insert(ext.to_lowercase(), mime);
    }

    /// Looks up the MIME type for an extension (without the dot).
    pub fn for_extension(&self, ext: &str) -> Option<&'static str> {
        self.extension_map.get(&ext.to_lowercase()).copied()
    }

    /// Guesses the MIME type of a file from its name.
    ///
    /// Tarball aliases such as `.tgz` are first rewritten to their long form,
    /// then a trailing compression suffix (`.gz`, `.bz2`, `.xz`, `.Z`, `.br`)
    /// is set aside and the extension before it decides the type. So
    /// `backup.tar.gz` is `application/x-tar`, while a bare `dump.gz` has no
    /// type at all.
    ///
    /// # Arguments
    ///
    /// * `file_name` - A bare file name; directories in front of it are not expected
    ///
    /// # Examples
    ///
    /// ```
    /// use dorg::mime::MimeTable;
    ///
    /// let table = MimeTable::default();
    /// assert_eq!(table.guess("site.tgz"), Some("application/x-tar"));
    /// assert_eq!(table.guess("dump.gz"), None);
    /// ```
    pub fn guess(&self, file_name: &str) -> Option<&'static str> {
        let mut name = file_name.to_lowercase();
        while let Some(expanded) = expand_suffix_alias(&name) {
            name = expanded;
        }

        let (base, mut ext) = split_extension(&name)?;
        if COMPRESSION_SUFFIXES.contains(&ext) {
            (_, ext) = split_extension(base)?;
        }
        self.for_extension(ext)
    }
}

/// Splits `name` into the part before its last extension and the extension.
/// A leading dot does not start an extension.
fn split_extension(name: &str) -> Option<(&str, &str)> {
    let ext = Path::new(name).extension()?.to_str()?;
    let base = &name[..name.len() - ext.len() - 1];
    Some((base, ext))
}

fn expand_suffix_alias(name: &str) -> Option<String> {
    let (base, ext) = split_extension(name)?;
    SUFFIX_ALIASES
        .iter()
        .find(|(alias, _)| *alias == ext)
        .map(|(_, full)| format!("{}.{}", base, full))
}

impl Default for MimeTable {
    fn default() -> Self {
        Self::new()
    }
}
