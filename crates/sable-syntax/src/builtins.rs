/// Types always visible to attribution, even with an empty classpath.
///
/// Nested types use source names (`Map.Entry`, not `Map$Entry`).
pub const BOOT_TYPES: &[&str] = &[
    "java.lang.AutoCloseable",
    "java.lang.Boolean",
    "java.lang.Byte",
    "java.lang.CharSequence",
    "java.lang.Character",
    "java.lang.Class",
    "java.lang.ClassCastException",
    "java.lang.Cloneable",
    "java.lang.Comparable",
    "java.lang.Deprecated",
    "java.lang.Double",
    "java.lang.Enum",
    "java.lang.Error",
    "java.lang.Exception",
    "java.lang.Float",
    "java.lang.FunctionalInterface",
    "java.lang.IllegalArgumentException",
    "java.lang.IllegalStateException",
    "java.lang.IndexOutOfBoundsException",
    "java.lang.Integer",
    "java.lang.InterruptedException",
    "java.lang.Iterable",
    "java.lang.Long",
    "java.lang.Math",
    "java.lang.NullPointerException",
    "java.lang.Number",
    "java.lang.Object",
    "java.lang.Override",
    "java.lang.Record",
    "java.lang.Runnable",
    "java.lang.RuntimeException",
    "java.lang.SafeVarargs",
    "java.lang.Short",
    "java.lang.String",
    "java.lang.StringBuilder",
    "java.lang.SuppressWarnings",
    "java.lang.System",
    "java.lang.Thread",
    "java.lang.Throwable",
    "java.lang.UnsupportedOperationException",
    "java.lang.Void",
    "java.io.File",
    "java.io.IOException",
    "java.io.InputStream",
    "java.io.OutputStream",
    "java.io.PrintStream",
    "java.io.Serializable",
    "java.io.UncheckedIOException",
    "java.nio.file.Files",
    "java.nio.file.Path",
    "java.nio.file.Paths",
    "java.util.ArrayDeque",
    "java.util.ArrayList",
    "java.util.Arrays",
    "java.util.Collection",
    "java.util.Collections",
    "java.util.Comparator",
    "java.util.Deque",
    "java.util.HashMap",
    "java.util.HashSet",
    "java.util.Iterator",
    "java.util.LinkedHashMap",
    "java.util.LinkedHashSet",
    "java.util.LinkedList",
    "java.util.List",
    "java.util.Map",
    "java.util.Map.Entry",
    "java.util.Objects",
    "java.util.Optional",
    "java.util.Queue",
    "java.util.Set",
    "java.util.SortedMap",
    "java.util.TreeMap",
    "java.util.TreeSet",
    "java.util.function.BiFunction",
    "java.util.function.Consumer",
    "java.util.function.Function",
    "java.util.function.Predicate",
    "java.util.function.Supplier",
    "java.util.stream.Collectors",
    "java.util.stream.Stream",
];
