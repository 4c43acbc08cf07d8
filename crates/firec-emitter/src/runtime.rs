//! The runtime preamble embedded at the top of every generated translation
//! unit: allocation tracking, array storage, and string helpers.

pub const RUNTIME_PREAMBLE: &str = r#"#include <stdio.h>
#include <stdlib.h>
#include <string.h>
#include <stdbool.h>
#include <stdint.h>

static void *fs_alloc(size_t n) {
    void *p = malloc(n);
    if (!p) {
        fprintf(stderr, "firescript: out of memory\n");
        exit(1);
    }
    return p;
}

static void firescript_free(void *p) {
    if (p) {
        free(p);
    }
}

typedef struct {
    size_t len;
    size_t elem_size;
    void *data;
} fs_array;

static fs_array *fs_array_from(const void *src, size_t len, size_t elem_size) {
    fs_array *a = (fs_array *)fs_alloc(sizeof(fs_array));
    a->len = len;
    a->elem_size = elem_size;
    a->data = len ? fs_alloc(len * elem_size) : NULL;
    if (len) {
        memcpy(a->data, src, len * elem_size);
    }
    return a;
}

static void fs_array_free(fs_array *a) {
    if (a) {
        firescript_free(a->data);
        firescript_free(a);
    }
}

static char *fs_str_concat(const char *a, const char *b) {
    size_t la = strlen(a);
    size_t lb = strlen(b);
    char *out = (char *)fs_alloc(la + lb + 1);
    memcpy(out, a, la);
    memcpy(out + la, b, lb + 1);
    return out;
}

static bool fs_str_eq(const char *a, const char *b) {
    return strcmp(a, b) == 0;
}

static char *fs_int_to_str(long long v) {
    char *out = (char *)fs_alloc(32);
    snprintf(out, 32, "%lld", v);
    return out;
}

static char *fs_uint_to_str(unsigned long long v) {
    char *out = (char *)fs_alloc(32);
    snprintf(out, 32, "%llu", v);
    return out;
}

static char *fs_float_to_str(double v) {
    char *out = (char *)fs_alloc(64);
    snprintf(out, 64, "%g", v);
    return out;
}

static const char *fs_bool_to_str(bool v) {
    return v ? "true" : "false";
}

static char *fs_array_to_str(const fs_array *a) {
    char *out = (char *)fs_alloc(48);
    snprintf(out, 48, "[array of %zu]", a ? a->len : (size_t)0);
    return out;
}

static char *fs_input(const char *prompt) {
    fputs(prompt, stdout);
    fflush(stdout);
    char buffer[4096];
    if (!fgets(buffer, sizeof buffer, stdin)) {
        buffer[0] = '\0';
    }
    size_t len = strlen(buffer);
    if (len && buffer[len - 1] == '\n') {
        buffer[len - 1] = '\0';
    }
    char *out = (char *)fs_alloc(len + 1);
    memcpy(out, buffer, len + 1);
    return out;
}
"#;
